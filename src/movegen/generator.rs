//! Legal move generation.
//!
//! Legality is enforced by construction rather than by make/test/unmake: an
//! opponent attack map constrains king moves, rays cast from the king record
//! pins and checks, and every generated move is filtered through the
//! resulting masks. Double check restricts generation to king moves.

use crate::board::bitboard::{contains, rank_mask, rank_of, square_mask};
use crate::board::board::Board;
use crate::board::piece::{
    Color, PieceKind, Square, CASTLE_BLACK_KINGSIDE, CASTLE_BLACK_QUEENSIDE,
    CASTLE_WHITE_KINGSIDE, CASTLE_WHITE_QUEENSIDE,
};
use crate::movegen::magics::{bishop_attacks, queen_attacks, rook_attacks};
use crate::movegen::packed_move::{
    Move, FLAG_CASTLE, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT, FLAG_NONE, FLAG_PROMOTE_BISHOP,
    FLAG_PROMOTE_KNIGHT, FLAG_PROMOTE_QUEEN, FLAG_PROMOTE_ROOK,
};
use crate::movegen::tables::{
    align_mask, king_attacks, knight_attacks, pawn_attacks, tables, DIRECTION_OFFSETS,
};

/// Which under-promotions to generate; a search-speed/completeness trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionMode {
    All,
    QueenAndKnight,
    QueenOnly,
}

pub struct MoveGenerator {
    pub promotion_mode: PromotionMode,

    moves: Vec<Move>,
    us: Color,
    them: Color,
    friendly_king: Square,
    friendly: u64,
    enemy: u64,
    all: u64,

    in_check: bool,
    in_double_check: bool,
    /// Squares that block or capture the single checker; all-ones when not
    /// in check.
    check_ray_mask: u64,
    /// Squares occupied by pinned friendly pieces (and their pin rays).
    pin_rays: u64,
    opponent_attack_map: u64,
    include_quiet: bool,
}

impl MoveGenerator {
    pub fn new() -> Self {
        Self {
            promotion_mode: PromotionMode::All,
            moves: Vec::new(),
            us: Color::White,
            them: Color::Black,
            friendly_king: 0,
            friendly: 0,
            enemy: 0,
            all: 0,
            in_check: false,
            in_double_check: false,
            check_ray_mask: !0,
            pin_rays: 0,
            opponent_attack_map: 0,
            include_quiet: true,
        }
    }

    /// Whether the side to move was in check during the last generation call.
    #[inline]
    pub fn in_check(&self) -> bool {
        self.in_check
    }

    /// Generate all legal moves; with `include_quiet == false` only captures
    /// (including en passant and capture-promotions) are produced.
    pub fn generate_moves(&mut self, board: &Board, include_quiet: bool) -> Vec<Move> {
        self.moves = Vec::with_capacity(if include_quiet { 64 } else { 16 });
        self.us = board.color_to_move();
        self.them = self.us.opposite();
        self.friendly_king = board.king_square(self.us);
        self.friendly = board.color_bitboards[self.us.index()];
        self.enemy = board.color_bitboards[self.them.index()];
        self.all = board.all_pieces;
        self.include_quiet = include_quiet;

        self.calculate_attack_data(board);

        self.generate_king_moves(board);
        if !self.in_double_check {
            self.generate_slider_moves(board);
            self.generate_knight_moves(board);
            self.generate_pawn_moves(board);
        }

        std::mem::take(&mut self.moves)
    }

    // --- Attack map, pins, check rays ---

    fn calculate_attack_data(&mut self, board: &Board) {
        self.in_check = false;
        self.in_double_check = false;
        self.check_ray_mask = 0;
        self.pin_rays = 0;

        // Sliders see through the friendly king so it cannot retreat along a
        // checking ray.
        let occupancy_without_king = self.all & !square_mask(self.friendly_king);
        let mut attack_map = 0u64;
        for &square in board.piece_list(PieceKind::Rook, self.them).occupied_squares() {
            attack_map |= rook_attacks(square, occupancy_without_king);
        }
        for &square in board
            .piece_list(PieceKind::Bishop, self.them)
            .occupied_squares()
        {
            attack_map |= bishop_attacks(square, occupancy_without_king);
        }
        for &square in board
            .piece_list(PieceKind::Queen, self.them)
            .occupied_squares()
        {
            attack_map |= queen_attacks(square, occupancy_without_king);
        }
        for &square in board
            .piece_list(PieceKind::Knight, self.them)
            .occupied_squares()
        {
            attack_map |= knight_attacks(square);
        }
        for &square in board.piece_list(PieceKind::Pawn, self.them).occupied_squares() {
            attack_map |= pawn_attacks(self.them, square);
        }
        attack_map |= king_attacks(board.king_square(self.them));
        self.opponent_attack_map = attack_map;

        // Cast rays from the king: one friendly piece then a matching enemy
        // slider is a pin; a matching slider straight away is a check.
        let king = self.friendly_king;
        let orthogonal_sliders = board.orthogonal_sliders(self.them);
        let diagonal_sliders = board.diagonal_sliders(self.them);

        for dir in 0..8 {
            let sliders = if dir < 4 {
                orthogonal_sliders
            } else {
                diagonal_sliders
            };
            if tables().direction_ray[dir][king as usize] & sliders == 0 {
                continue;
            }

            let offset = DIRECTION_OFFSETS[dir];
            let steps = tables().squares_to_edge[king as usize][dir];
            let mut ray_mask = 0u64;
            let mut friendly_blocker = false;
            let mut current = king as i8;

            for _ in 0..steps {
                current += offset;
                let square = current as Square;
                ray_mask |= square_mask(square);
                let piece = board.piece_at(square);
                if piece.is_none() {
                    continue;
                }
                if piece.is_color(self.us) {
                    if friendly_blocker {
                        break; // two friendly pieces shield the king
                    }
                    friendly_blocker = true;
                    continue;
                }
                if sliders & square_mask(square) != 0 {
                    if friendly_blocker {
                        self.pin_rays |= ray_mask;
                    } else {
                        self.in_double_check = self.in_check;
                        self.in_check = true;
                        self.check_ray_mask |= ray_mask;
                    }
                }
                break; // any enemy piece ends the ray
            }
            if self.in_double_check {
                break;
            }
        }

        let knight_checks =
            knight_attacks(king) & board.piece_bitboard(PieceKind::Knight, self.them);
        if knight_checks != 0 {
            self.in_double_check = self.in_check;
            self.in_check = true;
            self.check_ray_mask |= knight_checks;
        }

        let pawn_checks = pawn_attacks(self.us, king) & board.piece_bitboard(PieceKind::Pawn, self.them);
        if pawn_checks != 0 {
            self.in_double_check = self.in_check;
            self.in_check = true;
            self.check_ray_mask |= pawn_checks;
        }

        if !self.in_check {
            self.check_ray_mask = !0;
        }
    }

    #[inline]
    fn is_pinned(&self, square: Square) -> bool {
        contains(self.pin_rays, square)
    }

    // --- Per-piece generation ---

    fn generate_king_moves(&mut self, board: &Board) {
        let from = self.friendly_king;
        let mut targets = king_attacks(from) & !self.friendly & !self.opponent_attack_map;
        if !self.include_quiet {
            targets &= self.enemy;
        }
        while targets != 0 {
            let to = targets.trailing_zeros() as Square;
            targets &= targets - 1;
            self.moves.push(Move::new(from, to, FLAG_NONE));
        }

        if self.in_check || !self.include_quiet {
            return;
        }

        let rights = board.castling_rights();
        let (kingside_right, queenside_right, rank_base) = if self.us.is_white() {
            (CASTLE_WHITE_KINGSIDE, CASTLE_WHITE_QUEENSIDE, 0u8)
        } else {
            (CASTLE_BLACK_KINGSIDE, CASTLE_BLACK_QUEENSIDE, 56u8)
        };

        let rook_bb = board.piece_bitboard(PieceKind::Rook, self.us);

        if rights & kingside_right != 0 && contains(rook_bb, rank_base + 7) {
            let path = square_mask(rank_base + 5) | square_mask(rank_base + 6);
            if self.all & path == 0 && self.opponent_attack_map & path == 0 {
                self.moves
                    .push(Move::new(from, rank_base + 6, FLAG_CASTLE));
            }
        }
        if rights & queenside_right != 0 && contains(rook_bb, rank_base) {
            let occupied_path = square_mask(rank_base + 1)
                | square_mask(rank_base + 2)
                | square_mask(rank_base + 3);
            // b1/b8 may be attacked; only the king's transit squares matter.
            let transit = square_mask(rank_base + 2) | square_mask(rank_base + 3);
            if self.all & occupied_path == 0 && self.opponent_attack_map & transit == 0 {
                self.moves
                    .push(Move::new(from, rank_base + 2, FLAG_CASTLE));
            }
        }
    }

    fn generate_slider_moves(&mut self, board: &Board) {
        for kind in [PieceKind::Rook, PieceKind::Bishop, PieceKind::Queen] {
            for &from in board.piece_list(kind, self.us).occupied_squares() {
                let mut targets = match kind {
                    PieceKind::Rook => rook_attacks(from, self.all),
                    PieceKind::Bishop => bishop_attacks(from, self.all),
                    _ => queen_attacks(from, self.all),
                };
                targets &= !self.friendly & self.check_ray_mask;
                if self.is_pinned(from) {
                    targets &= align_mask(self.friendly_king, from);
                }
                if !self.include_quiet {
                    targets &= self.enemy;
                }
                while targets != 0 {
                    let to = targets.trailing_zeros() as Square;
                    targets &= targets - 1;
                    self.moves.push(Move::new(from, to, FLAG_NONE));
                }
            }
        }
    }

    fn generate_knight_moves(&mut self, board: &Board) {
        for &from in board.piece_list(PieceKind::Knight, self.us).occupied_squares() {
            // A pinned knight can never stay on its pin ray.
            if self.is_pinned(from) {
                continue;
            }
            let mut targets = knight_attacks(from) & !self.friendly & self.check_ray_mask;
            if !self.include_quiet {
                targets &= self.enemy;
            }
            while targets != 0 {
                let to = targets.trailing_zeros() as Square;
                targets &= targets - 1;
                self.moves.push(Move::new(from, to, FLAG_NONE));
            }
        }
    }

    fn generate_pawn_moves(&mut self, board: &Board) {
        let push_offset: i8 = if self.us.is_white() { 8 } else { -8 };
        let start_rank: u8 = if self.us.is_white() { 1 } else { 6 };
        let promotion_rank: u8 = if self.us.is_white() { 7 } else { 0 };
        let en_passant_target = board.en_passant_square();

        for &from in board.piece_list(PieceKind::Pawn, self.us).occupied_squares() {
            let pinned = self.is_pinned(from);
            let pin_line = align_mask(self.friendly_king, from);

            // Pushes.
            if self.include_quiet {
                let one = (from as i8 + push_offset) as Square;
                if !contains(self.all, one) && (!pinned || contains(pin_line, one)) {
                    if contains(self.check_ray_mask, one) {
                        if rank_of(one) == promotion_rank {
                            self.push_promotions(from, one);
                        } else {
                            self.moves.push(Move::new(from, one, FLAG_NONE));
                        }
                    }
                    if rank_of(from) == start_rank {
                        let two = (one as i8 + push_offset) as Square;
                        if !contains(self.all, two) && contains(self.check_ray_mask, two) {
                            self.moves
                                .push(Move::new(from, two, FLAG_DOUBLE_PAWN_PUSH));
                        }
                    }
                }
            }

            // Captures.
            let mut targets = pawn_attacks(self.us, from) & self.enemy & self.check_ray_mask;
            if pinned {
                targets &= pin_line;
            }
            while targets != 0 {
                let to = targets.trailing_zeros() as Square;
                targets &= targets - 1;
                if rank_of(to) == promotion_rank {
                    self.push_promotions(from, to);
                } else {
                    self.moves.push(Move::new(from, to, FLAG_NONE));
                }
            }

            // En passant; the captured pawn sits beside the target square.
            if let Some(target) = en_passant_target {
                if contains(pawn_attacks(self.us, from), target) {
                    if pinned && !contains(pin_line, target) {
                        continue;
                    }
                    let captured_square = (target as i8 - push_offset) as Square;
                    if self.in_check
                        && !contains(self.check_ray_mask, target)
                        && !contains(self.check_ray_mask, captured_square)
                    {
                        continue;
                    }
                    if !self.en_passant_exposes_king(board, from, target, captured_square) {
                        self.moves.push(Move::new(from, target, FLAG_EN_PASSANT));
                    }
                }
            }
        }
    }

    /// Removing both pawns from one rank can uncover a rook or queen; the
    /// general pin logic cannot see this, so re-test the rank against the
    /// post-capture occupancy.
    fn en_passant_exposes_king(
        &self,
        board: &Board,
        from: Square,
        target: Square,
        captured_square: Square,
    ) -> bool {
        if rank_of(self.friendly_king) != rank_of(from) {
            return false;
        }
        let occupancy = (self.all ^ square_mask(from) ^ square_mask(captured_square))
            | square_mask(target);
        let rank_attacks =
            rook_attacks(self.friendly_king, occupancy) & rank_mask(rank_of(from));
        rank_attacks & board.orthogonal_sliders(self.them) != 0
    }

    fn push_promotions(&mut self, from: Square, to: Square) {
        self.moves.push(Move::new(from, to, FLAG_PROMOTE_QUEEN));
        match self.promotion_mode {
            PromotionMode::All => {
                self.moves.push(Move::new(from, to, FLAG_PROMOTE_ROOK));
                self.moves.push(Move::new(from, to, FLAG_PROMOTE_KNIGHT));
                self.moves.push(Move::new(from, to, FLAG_PROMOTE_BISHOP));
            }
            PromotionMode::QueenAndKnight => {
                self.moves.push(Move::new(from, to, FLAG_PROMOTE_KNIGHT));
            }
            PromotionMode::QueenOnly => {}
        }
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{MoveGenerator, PromotionMode};
    use crate::board::board::Board;
    use crate::movegen::packed_move::{FLAG_CASTLE, FLAG_EN_PASSANT};

    fn moves_of(fen: &str) -> (MoveGenerator, Vec<crate::movegen::packed_move::Move>) {
        let board = Board::from_fen(fen).expect("FEN should parse");
        let mut generator = MoveGenerator::new();
        let moves = generator.generate_moves(&board, true);
        (generator, moves)
    }

    #[test]
    fn start_position_has_twenty_moves() {
        let (generator, moves) = moves_of(crate::board::board::STARTING_POSITION_FEN);
        assert_eq!(moves.len(), 20);
        assert!(!generator.in_check());
    }

    #[test]
    fn double_check_allows_only_king_moves() {
        // Rook on e8 and bishop on h4 both give check.
        let (generator, moves) = moves_of("4r2k/8/8/8/7b/8/3R4/4K3 w - - 0 1");
        assert!(generator.in_check());
        for mv in &moves {
            assert_eq!(mv.from(), 4, "only the king may move in double check");
        }
        assert!(!moves.is_empty());
    }

    #[test]
    fn pinned_pieces_stay_on_their_ray() {
        // The d2 rook is pinned by the d8 rook; it may slide along the d-file
        // but never leave it.
        let (_, moves) = moves_of("3r3k/8/8/8/8/8/3R4/3K4 w - - 0 1");
        for mv in moves.iter().filter(|m| m.from() == 11) {
            assert_eq!(mv.to() % 8, 3, "pinned rook left the d-file");
        }
        assert!(moves.iter().any(|m| m.from() == 11 && m.to() == 59));
    }

    #[test]
    fn pinned_knight_cannot_move_at_all() {
        let (_, moves) = moves_of("3r3k/8/8/8/8/8/3N4/3K4 w - - 0 1");
        assert!(moves.iter().all(|m| m.from() != 11));
    }

    #[test]
    fn single_check_restricts_non_king_moves_to_the_check_ray() {
        // Black rook e8 checks the e1 king; the a2 rook interposes on e2, the
        // c3 knight on e2 or e4, and nothing else helps.
        let (generator, moves) = moves_of("4r2k/8/8/8/8/2N5/R7/4K3 w - - 0 1");
        assert!(generator.in_check());
        for mv in moves.iter().filter(|m| m.from() != 4) {
            let to_file = mv.to() % 8;
            assert_eq!(to_file, 4, "non-king move must land on the e-file check ray");
        }
        assert!(moves.iter().any(|m| m.from() == 8 && m.to() == 12)); // Rae2
        assert!(moves.iter().any(|m| m.from() == 18 && m.to() == 12)); // Nce2
    }

    #[test]
    fn castling_is_blocked_through_attacked_squares() {
        // Black rook on f8 attacks f1: kingside castling is illegal while
        // queenside stays available.
        let (_, moves) = moves_of("5r1k/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let castles: Vec<_> = moves.iter().filter(|m| m.flag() == FLAG_CASTLE).collect();
        assert_eq!(castles.len(), 1);
        assert_eq!(castles[0].to(), 2);
    }

    #[test]
    fn castling_rights_require_the_rook_at_home() {
        let (_, moves) = moves_of("7k/8/8/8/8/8/8/4K2R w K - 0 1");
        assert!(moves.iter().any(|m| m.flag() == FLAG_CASTLE));
        let (_, moves) = moves_of("7k/8/8/8/8/8/8/4K3 w K - 0 1");
        assert!(moves.iter().all(|m| m.flag() != FLAG_CASTLE));
    }

    #[test]
    fn en_passant_discovered_check_on_the_rank_is_rejected() {
        // King, both pawns, and a queen share rank 5: exd6 would expose the
        // king and must not be generated.
        let (_, moves) = moves_of("7k/8/8/K2pP2q/8/8/8/8 w - d6 0 1");
        assert!(moves.iter().all(|m| m.flag() != FLAG_EN_PASSANT));
        // The plain push is still available.
        assert!(moves.iter().any(|m| m.from() == 36 && m.to() == 44));
    }

    #[test]
    fn en_passant_can_capture_a_checking_pawn() {
        // White d2-d4 gave check; exd3 removes the checker en passant.
        let board = Board::from_fen("7K/8/8/2k5/3Pp3/8/8/8 b - d3 0 1").expect("FEN should parse");
        let mut generator = MoveGenerator::new();
        let moves = generator.generate_moves(&board, true);
        assert!(generator.in_check());
        assert!(moves.iter().any(|m| m.flag() == FLAG_EN_PASSANT && m.to() == 19));
    }

    #[test]
    fn promotion_modes_limit_generated_underpromotions() {
        let board = Board::from_fen("7k/1P6/8/8/8/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let mut generator = MoveGenerator::new();

        let all = generator.generate_moves(&board, true);
        assert_eq!(all.iter().filter(|m| m.is_promotion()).count(), 4);

        generator.promotion_mode = PromotionMode::QueenAndKnight;
        let two = generator.generate_moves(&board, true);
        assert_eq!(two.iter().filter(|m| m.is_promotion()).count(), 2);

        generator.promotion_mode = PromotionMode::QueenOnly;
        let one = generator.generate_moves(&board, true);
        assert_eq!(one.iter().filter(|m| m.is_promotion()).count(), 1);
    }

    #[test]
    fn capture_only_generation_returns_captures_only() {
        let board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .expect("FEN should parse");
        let mut generator = MoveGenerator::new();
        let captures = generator.generate_moves(&board, false);
        assert_eq!(captures.len(), 8, "Kiwipete has 8 captures at depth 1");
        for mv in &captures {
            let target_occupied = board.piece_at(mv.to()).is_some();
            assert!(
                target_occupied || mv.flag() == FLAG_EN_PASSANT,
                "non-capture produced in capture-only mode"
            );
        }
    }

    #[test]
    fn stalemate_position_generates_nothing() {
        let (generator, moves) = moves_of("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(moves.is_empty());
        assert!(!generator.in_check());
    }

    #[test]
    fn checkmate_position_generates_nothing_while_in_check() {
        let (generator, moves) = moves_of("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1");
        assert!(moves.is_empty());
        assert!(generator.in_check());
    }
}
