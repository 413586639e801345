//! Hand scoring.
//!
//! Ref: spec §4.2 "Card-Rules Engine" — makers taking 3-4 tricks score 1;
//! 5 tricks partnered score 2; 5 tricks alone score 4; defenders
//! euchring the makers (0-2 tricks) score 2. `score_hand` advances to
//! `deal` with rotated dealer, or to `completed` if a team reaches
//! `targetScore`.

use euchre_proto::game::{GameState, LastHand, PerSeat, Phase, Seat, Team};

pub fn score_hand(mut state: GameState) -> GameState {
    let maker_seat = state.maker.expect("score_hand runs only after a maker declared trump");
    let maker_team = maker_seat.team();
    let maker_tricks: u8 = Seat::ORDER
        .into_iter()
        .filter(|&seat| seat.team() == maker_team)
        .map(|seat| *state.tricks_won.get(seat))
        .sum();

    let (points, awarded_to) = if maker_tricks < 3 {
        (2, maker_team.opposing())
    } else if maker_tricks == 5 && state.alone {
        (4, maker_team)
    } else if maker_tricks == 5 {
        (2, maker_team)
    } else {
        (1, maker_team)
    };

    match awarded_to {
        Team::TeamA => state.scores.team_a += points,
        Team::TeamB => state.scores.team_b += points,
    }

    state.last_hand = Some(LastHand {
        maker: Some(maker_seat),
        alone: state.alone,
        tricks_won: state.tricks_won.clone(),
        points_awarded: points,
        awarded_to: Some(awarded_to),
    });

    if state.scores.team_a >= state.target_score || state.scores.team_b >= state.target_score {
        state.phase = Phase::Completed;
        state.winner = Some(if state.scores.team_a >= state.target_score {
            Team::TeamA
        } else {
            Team::TeamB
        });
        return state;
    }

    state.phase = Phase::Deal;
    state.hand_number += 1;
    state.dealer = state.dealer.next();
    state.hands = PerSeat::from_fn(|_| Vec::new());
    state.upcard = None;
    state.kitty = Vec::new();
    state.bidding = None;
    state.trump = None;
    state.maker = None;
    state.alone = false;
    state.partner_sits_out = None;
    state.trick = None;
    state.tricks_won = PerSeat::from_fn(|_| 0u8);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use euchre_proto::card::full_deck;
    use euchre_proto::game::Scores;

    fn base_state(maker: Seat, alone: bool, maker_tricks: u8) -> GameState {
        let mut state = crate::deal::deal_hand("game-1", Seat::North, 10, 1, Scores::default(), full_deck());
        state.maker = Some(maker);
        state.alone = alone;
        let partner_tricks = if alone { 0 } else { maker_tricks / 2 };
        let mut tricks = PerSeat::from_fn(|_| 0u8);
        tricks.set(maker, maker_tricks - partner_tricks);
        if !alone {
            let partner = match maker {
                Seat::North => Seat::South,
                Seat::South => Seat::North,
                Seat::East => Seat::West,
                Seat::West => Seat::East,
            };
            tricks.set(partner, partner_tricks);
        }
        let defender_tricks = 5 - maker_tricks;
        let opposing = maker.team().opposing();
        for seat in Seat::ORDER {
            if seat.team() == opposing {
                tricks.set(seat, defender_tricks / 2);
                break;
            }
        }
        state.tricks_won = tricks;
        state
    }

    #[test]
    fn test_makers_three_tricks_scores_one_point() {
        let state = base_state(Seat::East, false, 3);
        let scored = score_hand(state);
        assert_eq!(scored.scores.team_b, 1);
        assert_eq!(scored.phase, Phase::Deal);
    }

    #[test]
    fn test_makers_five_tricks_alone_scores_four_points() {
        let state = base_state(Seat::East, true, 5);
        let scored = score_hand(state);
        assert_eq!(scored.scores.team_b, 4);
    }

    #[test]
    fn test_makers_five_tricks_partnered_scores_two_points() {
        let state = base_state(Seat::North, false, 5);
        let scored = score_hand(state);
        assert_eq!(scored.scores.team_a, 2);
    }

    #[test]
    fn test_euchred_makers_awards_defenders_two_points() {
        let state = base_state(Seat::North, false, 1);
        let scored = score_hand(state);
        assert_eq!(scored.scores.team_b, 2);
        assert_eq!(scored.scores.team_a, 0);
    }

    #[test]
    fn test_reaching_target_score_completes_game() {
        let mut state = base_state(Seat::North, true, 5);
        state.target_score = 4;
        let scored = score_hand(state);
        assert_eq!(scored.phase, Phase::Completed);
        assert_eq!(scored.winner, Some(Team::TeamA));
    }

    #[test]
    fn test_dealer_rotates_after_each_hand() {
        let state = base_state(Seat::North, false, 3);
        let scored = score_hand(state);
        assert_eq!(scored.dealer, Seat::East);
        assert_eq!(scored.hand_number, 2);
    }
}
