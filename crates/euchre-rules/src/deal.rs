//! Hand dealing.
//!
//! Ref: spec §3 "GameState" invariants — the union of hands, kitty, upcard,
//! and trick plays is always exactly the 24-card deck. Shuffling is an
//! impure concern left to the caller: this function only distributes an
//! already-ordered 24-card deck, so it stays a pure function of its input.

use euchre_proto::card::Card;
use euchre_proto::game::{GameState, Phase, PerSeat, Scores, Seat};

/// Deals `shuffled_deck` (must contain exactly the 24-card set, in the
/// order to be dealt) into a fresh hand: 5 cards to each seat, 1 upcard,
/// 3 to the kitty.
///
/// # Panics
/// Panics if `shuffled_deck` does not have exactly 24 cards. Conservation
/// of the deck is a precondition enforced by the caller (orchestrator),
/// not a recoverable reject — it is a programmer-error class per spec §7.
pub fn deal_hand(
    game_id: impl Into<String>,
    dealer: Seat,
    target_score: u32,
    hand_number: u32,
    scores: Scores,
    shuffled_deck: Vec<Card>,
) -> GameState {
    assert_eq!(shuffled_deck.len(), 24, "deal requires exactly 24 cards");

    let mut deck = shuffled_deck.into_iter();
    let hands = PerSeat::from_fn(|_| deck.by_ref().take(5).collect::<Vec<Card>>());
    let upcard = deck.next();
    let kitty: Vec<Card> = deck.collect();
    assert_eq!(kitty.len(), 3, "deal requires exactly 3 kitty cards");

    GameState {
        game_id: game_id.into(),
        phase: Phase::Round1Bidding,
        hand_number,
        dealer,
        target_score,
        scores,
        winner: None,
        hands,
        upcard,
        kitty,
        bidding: Some(euchre_proto::game::Bidding::start_round1()),
        trump: None,
        maker: None,
        alone: false,
        partner_sits_out: None,
        trick: None,
        tricks_won: PerSeat::from_fn(|_| 0u8),
        last_hand: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euchre_proto::card::full_deck;

    #[test]
    fn test_deal_conserves_all_24_cards() {
        let state = deal_hand("game-1", Seat::North, 10, 1, Scores::default(), full_deck());
        let mut ids: Vec<String> = Vec::new();
        for seat in Seat::ORDER {
            ids.extend(state.hands.get(seat).iter().map(|c| c.id()));
        }
        ids.extend(state.kitty.iter().map(|c| c.id()));
        if let Some(up) = state.upcard {
            ids.push(up.id());
        }
        ids.sort();
        let mut expected: Vec<String> = full_deck().iter().map(|c| c.id()).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_deal_gives_five_cards_per_seat() {
        let state = deal_hand("game-1", Seat::North, 10, 1, Scores::default(), full_deck());
        for seat in Seat::ORDER {
            assert_eq!(state.hands.get(seat).len(), 5);
        }
        assert_eq!(state.kitty.len(), 3);
        assert!(state.upcard.is_some());
        assert_eq!(state.phase, Phase::Round1Bidding);
    }
}
