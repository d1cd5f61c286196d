//! Bare-FEN heuristic for non-JSON lines.
//!
//! A line that fails to parse as JSON is still accepted as a position
//! update when it looks like FEN:
//!
//! - every character is in `[rnbqkpRNBQKP1-8/\s-]` (piece placement, with
//!   optional `-` placeholders), or
//! - it is a full FEN record: placement, then up to five of side to move
//!   (`w`/`b`), castling (`KQkq` subset or `-`), en-passant square (`-` or
//!   e.g. `e3`), halfmove clock and fullmove number.
//!
//! No chess rules are checked here; the point is to tell FEN apart from
//! garbage, not to validate positions.

/// Characters allowed by the placement-only check.
fn is_placement_char(c: char) -> bool {
    matches!(
        c,
        'r' | 'n' | 'b' | 'q' | 'k' | 'p' | 'R' | 'N' | 'B' | 'Q' | 'K' | 'P' | '1'..='8' | '/' | '-'
    ) || c.is_whitespace()
}

/// True if `text` (already trimmed) should be classified as a bare FEN.
pub fn looks_like_fen(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    if text.chars().all(is_placement_char) {
        return true;
    }

    is_full_record(text)
}

fn is_full_record(text: &str) -> bool {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 2 || fields.len() > 6 {
        return false;
    }

    let placement = fields[0];
    if !placement.contains('/') || !placement.chars().all(|c| is_placement_char(c) && c != '-') {
        return false;
    }

    fields[1..].iter().enumerate().all(|(i, field)| match i {
        0 => matches!(*field, "w" | "b"),
        1 => *field == "-" || field.chars().all(|c| matches!(c, 'K' | 'Q' | 'k' | 'q')),
        2 => *field == "-" || is_en_passant_square(field),
        _ => field.chars().all(|c| c.is_ascii_digit()),
    })
}

fn is_en_passant_square(field: &str) -> bool {
    let mut chars = field.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some('a'..='h'), Some('3' | '6'), None)
    )
}
