//! Bidding transitions.
//!
//! Ref: spec §4.2 "Card-Rules Engine" — round 1 follows dealer-left; four
//! passes advance to round 2; four more passes trigger a redeal with
//! dealer rotated. `order_up` is round-1 only and selects the upcard suit
//! as trump. `call_trump` is round-2 only and must not choose the
//! turned-down suit. `alone=true` designates the maker's partner as
//! `partner_sits_out`.

use euchre_proto::card::{Card, Suit};
use euchre_proto::game::{GameState, Phase, Reject, RejectCode, RulesResult, Seat};

use crate::trick::start_first_trick;

fn reject(code: RejectCode, message: impl Into<String>, phase: Phase, action: &str) -> Reject {
    Reject {
        code,
        message: message.into(),
        phase: Some(phase),
        action: Some(action.to_string()),
    }
}

/// The seat whose turn it is to bid, given the seats that have already
/// passed this round.
fn current_bidder(dealer: Seat, passed_seats: &[Seat]) -> Seat {
    let mut seat = dealer.next();
    for _ in 0..passed_seats.len() {
        seat = seat.next();
    }
    seat
}

fn require_bidder_turn(state: &GameState, actor_seat: Seat, action: &str) -> Result<(), Reject> {
    let bidding = state.bidding.as_ref().expect("bidding state present during a bidding phase");
    let turn = current_bidder(state.dealer, &bidding.passed_seats);
    if actor_seat != turn {
        return Err(reject(
            RejectCode::NotYourTurn,
            format!("it is {:?}'s turn to bid, not {:?}'s", turn, actor_seat),
            state.phase,
            action,
        ));
    }
    Ok(())
}

pub fn order_up(state: &GameState, actor_seat: Seat, alone: bool) -> RulesResult {
    if state.phase != Phase::Round1Bidding {
        return Err(reject(
            RejectCode::InvalidState,
            "order_up is only legal in round 1 bidding",
            state.phase,
            "order_up",
        ));
    }
    require_bidder_turn(state, actor_seat, "order_up")?;

    let upcard = state
        .upcard
        .expect("upcard is always present while round1 bidding is open");
    let trump = upcard.suit;

    let mut next = state.clone();
    // Dealer picks up the upcard; per-seat hand size is restored to five
    // by automatically discarding the dealer's lowest-ranked off-trump
    // card, since the command surface exposes no separate discard action.
    next.upcard = None;
    let dealer_hand = next.hands.get_mut(state.dealer);
    dealer_hand.push(upcard);
    let discard_index = lowest_ranked_index(dealer_hand, trump);
    let discarded = dealer_hand.remove(discard_index);
    next.kitty.push(discarded);

    next.trump = Some(trump);
    next.maker = Some(actor_seat);
    next.alone = alone;
    next.partner_sits_out = if alone { Some(partner_of(actor_seat)) } else { None };
    next.bidding = None;

    Ok(start_first_trick(next))
}

pub fn call_trump(state: &GameState, actor_seat: Seat, trump: Suit, alone: bool) -> RulesResult {
    if state.phase != Phase::Round2Bidding {
        return Err(reject(
            RejectCode::InvalidState,
            "call_trump is only legal in round 2 bidding",
            state.phase,
            "call_trump",
        ));
    }
    require_bidder_turn(state, actor_seat, "call_trump")?;

    let bidding = state.bidding.as_ref().expect("bidding state present in round 2");
    if bidding.turned_down_suit == Some(trump) {
        return Err(reject(
            RejectCode::InvalidAction,
            "cannot call the turned-down suit as trump",
            state.phase,
            "call_trump",
        ));
    }

    let mut next = state.clone();
    next.trump = Some(trump);
    next.maker = Some(actor_seat);
    next.alone = alone;
    next.partner_sits_out = if alone { Some(partner_of(actor_seat)) } else { None };
    next.bidding = None;

    Ok(start_first_trick(next))
}

pub fn pass(state: &GameState, actor_seat: Seat) -> RulesResult {
    let action = "pass";
    match state.phase {
        Phase::Round1Bidding => {
            require_bidder_turn(state, actor_seat, action)?;
            let mut next = state.clone();
            let bidding = next.bidding.as_mut().expect("round1 bidding state present");
            bidding.passed_seats.push(actor_seat);

            if bidding.passed_seats.len() == 4 {
                let turned_down = next.upcard.take();
                if let Some(card) = turned_down {
                    next.kitty.push(card);
                }
                let turned_down_suit = next.kitty.last().map(|c: &Card| c.suit);
                next.bidding = Some(euchre_proto::game::Bidding {
                    round: 2,
                    passed_seats: Vec::new(),
                    turned_down_suit,
                });
                next.phase = Phase::Round2Bidding;
            }
            Ok(next)
        }
        Phase::Round2Bidding => {
            require_bidder_turn(state, actor_seat, action)?;
            let mut next = state.clone();
            let bidding = next.bidding.as_mut().expect("round2 bidding state present");
            bidding.passed_seats.push(actor_seat);

            if bidding.passed_seats.len() == 4 {
                // All eight bids failed: redeal with dealer rotated. The
                // caller (dispatcher/orchestrator) re-shuffles and calls
                // `deal_hand` again; here we only signal the transition.
                next.phase = Phase::Deal;
                next.dealer = next.dealer.next();
                next.bidding = None;
            }
            Ok(next)
        }
        _ => Err(reject(
            RejectCode::InvalidState,
            "pass is only legal during bidding",
            state.phase,
            action,
        )),
    }
}

fn partner_of(seat: Seat) -> Seat {
    match seat {
        Seat::North => Seat::South,
        Seat::South => Seat::North,
        Seat::East => Seat::West,
        Seat::West => Seat::East,
    }
}

/// Index of the dealer's weakest card under the new trump, used to pick an
/// automatic discard after picking up the upcard.
fn lowest_ranked_index(hand: &[Card], trump: Suit) -> usize {
    hand.iter()
        .enumerate()
        .min_by_key(|(_, card)| card.trick_rank(trump, card.effective_suit(trump)))
        .map(|(i, _)| i)
        .expect("dealer hand is never empty after picking up the upcard")
}

#[cfg(test)]
mod tests {
    use super::*;
    use euchre_proto::card::{Rank, full_deck};
    use euchre_proto::game::Scores;

    fn fresh_deal() -> GameState {
        crate::deal::deal_hand("game-1", Seat::North, 10, 1, Scores::default(), full_deck())
    }

    #[test]
    fn test_bidding_starts_at_dealer_left() {
        let state = fresh_deal();
        let bidding = state.bidding.as_ref().unwrap();
        assert_eq!(current_bidder(state.dealer, &bidding.passed_seats), Seat::East);
    }

    #[test]
    fn test_order_up_out_of_turn_is_rejected() {
        let state = fresh_deal();
        let result = order_up(&state, Seat::South, false);
        assert_eq!(result.unwrap_err().code, RejectCode::NotYourTurn);
    }

    #[test]
    fn test_order_up_sets_trump_to_upcard_suit_and_starts_play() {
        let state = fresh_deal();
        let upcard_suit = state.upcard.unwrap().suit;
        let next = order_up(&state, Seat::East, false).unwrap();
        assert_eq!(next.trump, Some(upcard_suit));
        assert_eq!(next.maker, Some(Seat::East));
        assert_eq!(next.phase, Phase::Play);
        assert_eq!(next.hands.get(Seat::North).len(), 5);
        assert!(next.upcard.is_none());
    }

    #[test]
    fn test_four_passes_advances_to_round_two() {
        let mut state = fresh_deal();
        for seat in [Seat::East, Seat::South, Seat::West, Seat::North] {
            state = pass(&state, seat).unwrap();
        }
        assert_eq!(state.phase, Phase::Round2Bidding);
        assert!(state.bidding.as_ref().unwrap().turned_down_suit.is_some());
    }

    #[test]
    fn test_call_trump_rejects_turned_down_suit() {
        let mut state = fresh_deal();
        let turned_down = state.upcard.unwrap().suit;
        for seat in [Seat::East, Seat::South, Seat::West, Seat::North] {
            state = pass(&state, seat).unwrap();
        }
        let other_suit = Suit::ALL.into_iter().find(|&s| s != turned_down).unwrap();
        let bad = call_trump(&state, Seat::East, turned_down, false);
        assert_eq!(bad.unwrap_err().code, RejectCode::InvalidAction);
        let good = call_trump(&state, Seat::East, other_suit, false);
        assert!(good.is_ok());
    }

    #[test]
    fn test_eight_passes_triggers_redeal_with_rotated_dealer() {
        let mut state = fresh_deal();
        for seat in [Seat::East, Seat::South, Seat::West, Seat::North] {
            state = pass(&state, seat).unwrap();
        }
        for seat in [Seat::East, Seat::South, Seat::West, Seat::North] {
            state = pass(&state, seat).unwrap();
        }
        assert_eq!(state.phase, Phase::Deal);
        assert_eq!(state.dealer, Seat::East);
    }

    #[test]
    fn test_alone_designates_partner_sits_out() {
        let state = fresh_deal();
        let next = order_up(&state, Seat::East, true).unwrap();
        assert_eq!(next.partner_sits_out, Some(Seat::West));
        assert!(!next.trick.as_ref().unwrap().seat_order.contains(&Seat::West));
    }

    #[test]
    fn test_lowest_ranked_index_picks_weakest_card() {
        let trump = Suit::Hearts;
        let hand = vec![
            Card::new(Suit::Hearts, Rank::A),
            Card::new(Suit::Clubs, Rank::Nine),
            Card::new(Suit::Hearts, Rank::J),
        ];
        assert_eq!(lowest_ranked_index(&hand, trump), 1);
    }
}
