//! Trick play transitions.
//!
//! Ref: spec §4.2 "Card-Rules Engine" — seat order rotates clockwise
//! north→east→south→west, excluding `partnerSitsOut`. The left bower's
//! effective suit is trump; follow-suit is evaluated against effective
//! suit. Violating follow-suit when possible yields `INVALID_ACTION`
//! (flattened from the `MUST_FOLLOW_SUIT` subcode).

use euchre_proto::card::Card;
use euchre_proto::game::{GameState, Phase, Reject, RejectCode, RulesResult, Seat, Trick, TrickPlay};

use crate::scoring::score_hand;

fn reject(code: RejectCode, message: impl Into<String>, phase: Phase, action: &str) -> Reject {
    Reject {
        code,
        message: message.into(),
        phase: Some(phase),
        action: Some(action.to_string()),
    }
}

fn active_seats_from(lead: Seat, partner_sits_out: Option<Seat>) -> Vec<Seat> {
    let mut seat = lead;
    let mut order = Vec::with_capacity(4);
    for _ in 0..4 {
        if Some(seat) != partner_sits_out {
            order.push(seat);
        }
        seat = seat.next();
    }
    order
}

/// Builds the first trick of a hand once trump has been declared; the
/// leader is always the seat to the dealer's left, skipping a sitting-out
/// partner.
pub fn start_first_trick(mut state: GameState) -> GameState {
    let mut lead = state.dealer.next();
    while Some(lead) == state.partner_sits_out {
        lead = lead.next();
    }
    state.trick = Some(Trick {
        seat_order: active_seats_from(lead, state.partner_sits_out),
        lead_seat: lead,
        plays: Vec::new(),
        led_suit: None,
    });
    state.phase = Phase::Play;
    state
}

fn current_turn(trick: &Trick) -> Option<Seat> {
    trick.seat_order.get(trick.plays.len()).copied()
}

fn hand_has_suit(hand: &[Card], suit: euchre_proto::card::Suit, trump: euchre_proto::card::Suit) -> bool {
    hand.iter().any(|c| c.effective_suit(trump) == suit)
}

pub fn play_card(state: &GameState, actor_seat: Seat, card_id: &str) -> RulesResult {
    if state.phase != Phase::Play {
        return Err(reject(
            RejectCode::InvalidState,
            "play_card is only legal during the play phase",
            state.phase,
            "play_card",
        ));
    }
    let trump = state.trump.expect("trump is set once play begins");
    let trick = state
        .trick
        .as_ref()
        .expect("trick state is present during the play phase");

    let Some(turn) = current_turn(trick) else {
        return Err(reject(
            RejectCode::InvalidState,
            "trick is already complete",
            state.phase,
            "play_card",
        ));
    };
    if actor_seat != turn {
        return Err(reject(
            RejectCode::NotYourTurn,
            format!("it is {:?}'s turn to play, not {:?}'s", turn, actor_seat),
            state.phase,
            "play_card",
        ));
    }

    let Some(card) = Card::parse_id(card_id) else {
        return Err(reject(
            RejectCode::InvalidAction,
            format!("\"{card_id}\" is not a valid card id"),
            state.phase,
            "play_card",
        ));
    };

    let hand = state.hands.get(actor_seat);
    let Some(hand_index) = hand.iter().position(|&c| c == card) else {
        return Err(reject(
            RejectCode::InvalidAction,
            format!("{actor_seat:?} does not hold {card_id}"),
            state.phase,
            "play_card",
        ));
    };

    if let Some(led_suit) = trick.led_suit {
        let played_effective = card.effective_suit(trump);
        if played_effective != led_suit && hand_has_suit(hand, led_suit, trump) {
            return Err(reject(
                RejectCode::InvalidAction,
                "must follow suit when able",
                state.phase,
                "play_card",
            ));
        }
    }

    let mut next = state.clone();
    next.hands.get_mut(actor_seat).remove(hand_index);
    let trick_mut = next.trick.as_mut().expect("checked above");
    if trick_mut.led_suit.is_none() {
        trick_mut.led_suit = Some(card.effective_suit(trump));
    }
    trick_mut.plays.push(TrickPlay { seat: actor_seat, card });

    if trick_mut.plays.len() == trick_mut.seat_order.len() {
        let led_suit = trick_mut.led_suit.expect("led suit set by the first play");
        let winner = trick_mut
            .plays
            .iter()
            .max_by_key(|p| p.card.trick_rank(trump, led_suit))
            .map(|p| p.seat)
            .expect("a completed trick has at least one play");
        *next.tricks_won.get_mut(winner) += 1;

        let tricks_played: u8 = [Seat::North, Seat::East, Seat::South, Seat::West]
            .into_iter()
            .map(|seat| *next.tricks_won.get(seat))
            .sum();

        if tricks_played == 5 {
            next.phase = Phase::Score;
            next.trick = None;
            return Ok(score_hand(next));
        }

        next.trick = Some(Trick {
            seat_order: active_seats_from(winner, next.partner_sits_out),
            lead_seat: winner,
            plays: Vec::new(),
            led_suit: None,
        });
    }

    Ok(next)
}
