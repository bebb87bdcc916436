//! FEN-to-Board parser.
//!
//! Reconstructs the full incremental state from a Forsyth-Edwards Notation
//! string: bitboards, piece lists, king caches, rights, clocks, and the
//! from-scratch Zobrist key. Everything afterwards is maintained
//! incrementally by make/unmake.

use crate::board::bitboard::{file_of, rank_of};
use crate::board::board::Board;
use crate::board::piece::{
    CastlingRights, Color, Piece, PieceKind, CASTLE_BLACK_KINGSIDE, CASTLE_BLACK_QUEENSIDE,
    CASTLE_WHITE_KINGSIDE, CASTLE_WHITE_QUEENSIDE,
};
use crate::utils::algebraic::algebraic_to_square;

pub fn parse_fen(fen: &str) -> Result<Board, String> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or("missing board layout in FEN")?;
    let side_part = parts.next().ok_or("missing side-to-move in FEN")?;
    let castling_part = parts.next().ok_or("missing castling rights in FEN")?;
    let en_passant_part = parts.next().ok_or("missing en-passant square in FEN")?;
    let halfmove_part = parts.next().unwrap_or("0");
    let fullmove_part = parts.next().unwrap_or("1");

    if parts.next().is_some() {
        return Err("FEN has extra trailing fields".to_owned());
    }

    let mut board = Board::new_empty();
    parse_board(board_part, &mut board)?;

    board.white_to_move = match side_part {
        "w" => true,
        "b" => false,
        other => return Err(format!("invalid side-to-move field '{other}'")),
    };

    let castling_rights = parse_castling_rights(castling_part)?;
    let en_passant_file = parse_en_passant_file(en_passant_part, board.white_to_move)?;

    let halfmove_clock = halfmove_part
        .parse::<u16>()
        .map_err(|_| format!("invalid halfmove clock '{halfmove_part}'"))?;
    let fullmove_number = fullmove_part
        .parse::<u32>()
        .map_err(|_| format!("invalid fullmove number '{fullmove_part}'"))?
        .max(1);

    board.ply_count = (fullmove_number - 1) * 2 + u32::from(!board.white_to_move);

    if board.piece_bitboard(PieceKind::King, Color::White).count_ones() != 1
        || board.piece_bitboard(PieceKind::King, Color::Black).count_ones() != 1
    {
        return Err("each side must have exactly one king".to_owned());
    }

    board.finish_setup(castling_rights, en_passant_file, halfmove_clock);
    Ok(board)
}

fn parse_board(board_part: &str, board: &mut Board) -> Result<(), String> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err("board layout must contain 8 ranks".to_owned());
    }

    // The piece lists have fixed capacity; cap per-code counts up front.
    let mut counts = [0u8; Piece::CODE_COUNT];

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx as u8;
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(format!("invalid empty-square count '{ch}'"));
                }
                file += empty_count as u8;
                continue;
            }

            let piece = piece_from_fen_char(ch)
                .ok_or_else(|| format!("invalid piece character '{ch}' in board layout"))?;

            if file >= 8 {
                return Err("board rank has too many files".to_owned());
            }

            counts[piece.code()] += 1;
            if counts[piece.code()] > 16 {
                return Err(format!("implausible number of '{ch}' pieces in FEN"));
            }

            board.put_piece(piece, board_rank * 8 + file);
            file += 1;
        }

        if file != 8 {
            return Err("board rank does not sum to 8 files".to_owned());
        }
    }

    Ok(())
}

fn parse_castling_rights(castling_part: &str) -> Result<CastlingRights, String> {
    if castling_part == "-" {
        return Ok(0);
    }

    let mut rights: CastlingRights = 0;
    for ch in castling_part.chars() {
        match ch {
            'K' => rights |= CASTLE_WHITE_KINGSIDE,
            'Q' => rights |= CASTLE_WHITE_QUEENSIDE,
            'k' => rights |= CASTLE_BLACK_KINGSIDE,
            'q' => rights |= CASTLE_BLACK_QUEENSIDE,
            _ => return Err(format!("invalid castling rights character '{ch}'")),
        }
    }
    Ok(rights)
}

/// Returns the internal en-passant encoding: `0` = none, else `file + 1`.
fn parse_en_passant_file(en_passant_part: &str, white_to_move: bool) -> Result<u8, String> {
    if en_passant_part == "-" {
        return Ok(0);
    }
    let square = algebraic_to_square(en_passant_part)?;
    let expected_rank = if white_to_move { 5 } else { 2 };
    if rank_of(square) != expected_rank {
        return Err(format!(
            "en-passant square '{en_passant_part}' on impossible rank"
        ));
    }
    Ok(file_of(square) + 1)
}

fn piece_from_fen_char(ch: char) -> Option<Piece> {
    let color = if ch.is_ascii_uppercase() {
        Color::White
    } else if ch.is_ascii_lowercase() {
        Color::Black
    } else {
        return None;
    };

    let kind = match ch.to_ascii_lowercase() {
        'p' => PieceKind::Pawn,
        'n' => PieceKind::Knight,
        'b' => PieceKind::Bishop,
        'r' => PieceKind::Rook,
        'q' => PieceKind::Queen,
        'k' => PieceKind::King,
        _ => return None,
    };

    Some(Piece::new(kind, color))
}
