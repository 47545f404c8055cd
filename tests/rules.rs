//! Rules-level behaviour checked through the public API.

use terminal_chess::ai::{MinimaxAi, search_best_move};
use terminal_chess::engine::board::Position;
use terminal_chess::engine::game::{Game, MoveRequest};
use terminal_chess::engine::movegen::{legal_moves, legal_moves_from};
use terminal_chess::engine::rules;
use terminal_chess::engine::types::{
    ChessError, Color, Difficulty, GameResult, Move, MoveFlags, PieceType, Square,
};

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).unwrap()
}

fn pos(fen: &str) -> Position {
    Position::from_fen(fen).unwrap()
}

fn play(game: &mut Game, moves: &[&str]) {
    for text in moves {
        let req = MoveRequest::new(sq(&text[0..2]), sq(&text[2..4]));
        let mv = game.resolve_request(&req).unwrap();
        game.make_move(mv).unwrap();
    }
}

fn has_castle(pos: &Position, kingside: bool) -> bool {
    legal_moves(pos).iter().any(|m| {
        if kingside {
            m.flags.is_castle_kingside()
        } else {
            m.flags.is_castle_queenside()
        }
    })
}

// =====================================================================
// Legality and make/undo
// =====================================================================

#[test]
fn no_legal_move_leaves_own_king_attacked() {
    for fen in [
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ] {
        let mut p = pos(fen);
        let mover = p.side_to_move;
        for mv in legal_moves(&p) {
            let undo = p.make_move(mv);
            assert!(
                !p.is_square_attacked(p.king_sq(mover), !mover),
                "{mv} leaves the king attacked in {fen}"
            );
            p.undo_move(mv, &undo);
        }
    }
}

#[test]
fn make_then_undo_restores_every_field() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 3 12";
    let original = pos(fen);
    for mv in legal_moves(&original) {
        let (after, record) = rules::apply(&original, mv).unwrap();
        let back = rules::undo(&after, mv, &record);
        assert_eq!(back, original, "{mv}");
        assert_eq!(back.castling_rights, original.castling_rights);
        assert_eq!(back.en_passant, original.en_passant);
        assert_eq!(back.halfmove_clock, 3);
    }
}

#[test]
fn initial_position_has_twenty_moves() {
    assert_eq!(legal_moves(&Position::starting()).len(), 20);
}

#[test]
fn apply_rejects_illegal_input() {
    let start = Position::starting();
    let err = rules::apply(&start, Move::new(sq("e2"), sq("e5"))).unwrap_err();
    assert!(matches!(err, ChessError::PreconditionViolation(_)));
    assert!(!err.is_recoverable());

    let promo = Move::with_promotion(sq("a7"), sq("a8"), PieceType::King, MoveFlags::NONE);
    let p = pos("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
    assert!(matches!(
        rules::apply(&p, promo),
        Err(ChessError::IllegalPromotionChoice(_))
    ));
}

// =====================================================================
// Terminal states
// =====================================================================

#[test]
fn checkmate_versus_stalemate() {
    let mated = pos("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    assert!(rules::is_check(&mated));
    assert!(legal_moves(&mated).is_empty());
    assert_eq!(
        rules::evaluate(&mated, &[mated.key()]),
        GameResult::Checkmate(Color::Black)
    );

    let stale = pos("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    assert!(!rules::is_check(&stale));
    assert!(legal_moves(&stale).is_empty());
    assert_eq!(rules::evaluate(&stale, &[stale.key()]), GameResult::Stalemate);
}

#[test]
fn fifty_move_rule_at_one_hundred_half_moves() {
    let p = pos("4k3/8/8/8/8/8/8/R3K3 w - - 99 60");
    assert_eq!(rules::evaluate(&p, &[p.key()]), GameResult::Ongoing);

    let (after, _) = rules::apply(&p, Move::new(sq("a1"), sq("a2"))).unwrap();
    assert_eq!(after.halfmove_clock, 100);
    assert_eq!(
        rules::evaluate(&after, &[p.key(), after.key()]),
        GameResult::DrawByFiftyMove
    );
}

#[test]
fn threefold_repetition_on_third_occurrence() {
    let mut game = Game::new();
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];

    play(&mut game, &shuffle);
    assert_eq!(game.result(), GameResult::Ongoing, "second occurrence");
    assert_eq!(
        rules::repetition_count(game.position_keys(), &game.position().key()),
        2
    );

    play(&mut game, &shuffle[..3]);
    assert_eq!(game.result(), GameResult::Ongoing);
    play(&mut game, &shuffle[3..]);
    assert_eq!(game.result(), GameResult::DrawByRepetition);
}

#[test]
fn insufficient_material() {
    for fen in [
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
        "4k3/8/8/8/8/8/8/3NK3 w - - 0 1",
        "4k3/8/8/8/8/8/8/2B1K3 b - - 0 1",
        "4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1",
    ] {
        let p = pos(fen);
        assert_eq!(
            rules::evaluate(&p, &[p.key()]),
            GameResult::DrawByInsufficientMaterial,
            "{fen}"
        );
    }
    // Opposite-coloured bishops and a lone pawn can still mate.
    assert!(!rules::is_insufficient_material(&pos("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1")));
    assert!(!rules::is_insufficient_material(&pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
}

// =====================================================================
// Special moves
// =====================================================================

#[test]
fn en_passant_removes_the_passed_pawn() {
    let mut game = Game::from_fen("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
    play(&mut game, &["e2e4"]);
    assert_eq!(game.position().en_passant, Some(sq("e3")));

    let capture = legal_moves_from(game.position(), sq("d4"))
        .into_iter()
        .find(|m| m.to == sq("e3"))
        .expect("en passant available");
    assert!(capture.flags.is_en_passant());

    let san = game.make_move(capture).unwrap();
    assert_eq!(san, "dxe3");
    let p = game.position();
    assert_eq!(p.piece_at(sq("e3")), Some((Color::Black, PieceType::Pawn)));
    assert_eq!(p.piece_at(sq("e4")), None);
    assert_eq!(p.piece_at(sq("d4")), None);
    assert_eq!(game.captured_by(Color::Black), vec![PieceType::Pawn]);
}

#[test]
fn en_passant_expires_after_one_move() {
    let mut game = Game::from_fen("4k3/7p/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
    play(&mut game, &["e2e4", "h7h6", "e1d2"]);
    assert!(
        legal_moves_from(game.position(), sq("d4"))
            .iter()
            .all(|m| !m.flags.is_en_passant())
    );
}

#[test]
fn pawn_on_d5_takes_e4_directly() {
    let mut game = Game::from_fen("4k3/8/8/3p4/8/8/4P3/4K3 w - - 0 1").unwrap();
    play(&mut game, &["e2e4"]);

    let req = MoveRequest::new(sq("d5"), sq("e4"));
    let mv = game.resolve_request(&req).unwrap();
    assert!(mv.flags.is_capture());
    assert!(!mv.flags.is_en_passant());

    assert_eq!(game.make_move(mv).unwrap(), "dxe4");
    assert_eq!(
        game.position().piece_at(sq("e4")),
        Some((Color::Black, PieceType::Pawn))
    );
    assert_eq!(game.position().en_passant, None);
}

#[test]
fn castling_needs_empty_path() {
    let p = pos("r3k2r/8/8/8/8/8/8/R3KB1R w KQkq - 0 1");
    assert!(!has_castle(&p, true));
    assert!(has_castle(&p, false));
}

#[test]
fn castling_refused_while_in_check() {
    let p = pos("4k3/4r3/8/8/8/8/8/R3K2R w KQ - 0 1");
    assert!(rules::is_check(&p));
    assert!(!has_castle(&p, true));
    assert!(!has_castle(&p, false));
}

#[test]
fn castling_refused_after_rook_or_king_moved() {
    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    play(&mut game, &["h1h2", "a8a7", "h2h1", "a7a8"]);
    assert!(!has_castle(game.position(), true));
    assert!(has_castle(game.position(), false));

    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    play(&mut game, &["e1f1", "e8f8", "f1e1", "f8e8"]);
    assert!(!has_castle(game.position(), true));
    assert!(!has_castle(game.position(), false));
    assert_eq!(game.position().castling_rights.to_fen(), "-");
}

#[test]
fn castling_moves_the_rook() {
    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mv = game
        .resolve_request(&MoveRequest::new(sq("e1"), sq("g1")))
        .unwrap();
    assert_eq!(game.make_move(mv).unwrap(), "O-O");
    let p = game.position();
    assert_eq!(p.piece_at(sq("g1")), Some((Color::White, PieceType::King)));
    assert_eq!(p.piece_at(sq("f1")), Some((Color::White, PieceType::Rook)));
    assert_eq!(p.piece_at(sq("h1")), None);
}

#[test]
fn promotion_defaults_to_queen_and_rejects_king() {
    let mut game = Game::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let err = game
        .resolve_request(&MoveRequest::with_promotion(sq("a7"), sq("a8"), 'k'))
        .unwrap_err();
    assert_eq!(err, ChessError::IllegalPromotionChoice("k".into()));

    let under = game
        .resolve_request(&MoveRequest::with_promotion(sq("a7"), sq("a8"), 'n'))
        .unwrap();
    assert_eq!(under.promotion, Some(PieceType::Knight));

    let mv = game
        .resolve_request(&MoveRequest::new(sq("a7"), sq("a8")))
        .unwrap();
    assert_eq!(mv.promotion, Some(PieceType::Queen));
    assert_eq!(game.make_move(mv).unwrap(), "a8=Q+");
}

// =====================================================================
// Search
// =====================================================================

#[test]
fn depth_one_finds_mate_in_one() {
    let p = pos("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
    let mv = search_best_move(&p, 1).unwrap();
    assert_eq!(mv, Move::new(sq("a1"), sq("a8")));

    let (after, _) = rules::apply(&p, mv).unwrap();
    assert_eq!(
        rules::evaluate(&after, &[p.key(), after.key()]),
        GameResult::Checkmate(Color::White)
    );
}

#[test]
fn search_leaves_position_unchanged() {
    let original = pos("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
    let mut scratch = original.clone();
    let (best, stats) = MinimaxAi::new().search_fixed_depth(&mut scratch, 3);
    assert!(best.is_some());
    assert!(stats.nodes > 0);
    assert_eq!(scratch, original);
}

#[test]
fn no_move_when_game_is_over() {
    let mated = pos("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    assert_eq!(search_best_move(&mated, 3), None);
}

#[test]
fn higher_difficulty_searches_deeper() {
    for pair in Difficulty::ALL.windows(2) {
        assert!(pair[0].depth() < pair[1].depth(), "{} vs {}", pair[0], pair[1]);
    }
}
