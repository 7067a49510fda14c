use proptest::prelude::*;
use sokoban_ids::{Board, Cell, Direction, Position};

const LEVELS: &[&str] = &[
    "####\n# .#\n#  ###\n#*@  #\n#  $ #\n#  ###\n####",
    "#####\n#   #\n#.$.#\n# $ #\n#+$ #\n#####",
    "  ####\n  #  #\n### .#\n#  * #\n# #@ #\n# $* #\n##   #\n #####",
    "#######\n# . * #\n#.*$ .#\n# $ $ #\n#*$ .*#\n#@* * #\n#######",
    "#########\n#@      #\n# $   $ #\n#       #\n# .   . #\n#########",
];

fn level() -> impl Strategy<Value = Board> {
    prop::sample::select(LEVELS.to_vec()).prop_map(|text| text.parse::<Board>().expect("valid level"))
}

fn walk() -> impl Strategy<Value = Vec<Direction>> {
    prop::collection::vec(prop::sample::select(Direction::ALL.to_vec()), 0..60)
}

/// Applies the legal moves of `dirs`, skipping the rest.
fn play(board: &mut Board, dirs: &[Direction]) -> usize {
    let mut applied = 0;
    for &dir in dirs {
        if board.is_legal(dir) {
            board.make_move(dir);
            applied += 1;
        }
    }
    applied
}

fn uncovered_goals(board: &Board) -> usize {
    board.goals().filter(|&g| !board.is(g, Cell::BOX)).count()
}

proptest! {
    #[test]
    fn undo_restores_every_bit(mut board in level(), dirs in walk()) {
        let original = board.clone();
        let applied = play(&mut board, &dirs);
        for _ in 0..applied {
            prop_assert!(board.undo_move().is_some());
        }
        prop_assert_eq!(board.undo_move(), None);
        prop_assert_eq!(board, original);
    }

    #[test]
    fn counters_and_hash_track_the_grid(mut board in level(), dirs in walk()) {
        for &dir in &dirs {
            if !board.is_legal(dir) {
                continue;
            }
            board.make_move(dir);
            prop_assert_eq!(board.fingerprint(), board.zobrist().full_hash(&board));
            prop_assert_eq!(board.remaining_boxes(), uncovered_goals(&board));
            prop_assert_eq!(board.is_solved(), uncovered_goals(&board) == 0);
        }
    }

    #[test]
    fn relocation_is_an_exact_inverse(mut board in level(), pick in any::<prop::sample::Index>(), dir_pick in 0usize..4) {
        let original = board.clone();
        let boxes: Vec<Position> = board.boxes().collect();
        let from = *pick.get(&boxes);
        let dir = Direction::ALL[dir_pick];
        let to = from.step(dir);
        prop_assume!(!board.is(to, Cell::OCCUPIED));

        let player = board.player();
        board.relocate_box(from, to, from);
        prop_assert_eq!(board.fingerprint(), board.zobrist().full_hash(&board));
        prop_assert_eq!(board.remaining_boxes(), uncovered_goals(&board));
        board.relocate_box(to, from, player);
        prop_assert_eq!(board, original);
    }

    #[test]
    fn find_path_lands_on_target(board in level(), row in 0i16..9, col in 0i16..9) {
        let target = Position::new(row, col);
        if let Some(path) = board.find_path(target) {
            let mut at = board.player();
            for dir in path {
                at = at.step(dir);
                prop_assert!(!board.is(at, Cell::OCCUPIED));
            }
            prop_assert_eq!(at, target);
        }
    }

    #[test]
    fn reachable_pushes_are_legal_from_their_stand(mut board in level(), dirs in walk()) {
        play(&mut board, &dirs);
        board.commit();
        let reach = board.find_reachable_pushable_boxes();
        for m in reach.moves {
            let stand = m.box_pos.step(m.dir.opposite());
            prop_assert!(board.find_path(stand).is_some());
            prop_assert!(!board.is(m.box_pos.step(m.dir), Cell::REJECT_BOX));
        }
        prop_assert!(board.positions().all(|p| !board.is(p, Cell::REACHABLE)));
    }
}
