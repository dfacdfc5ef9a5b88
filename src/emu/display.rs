use super::{DISPLAY_X, DISPLAY_Y, Display};

pub fn blank() -> Display<bool> {
    [[false; DISPLAY_X]; DISPLAY_Y]
}

pub fn clear(display: &mut Display<bool>) {
    *display = blank();
}

/// XORs `sprite` onto the display with its top-left corner at `(x, y)`.
///
/// Only the origin wraps; pixels past the right or bottom edge are clipped.
/// Returns true if any pixel went from on to off.
pub fn draw_sprite(display: &mut Display<bool>, x: u8, y: u8, sprite: &[u8]) -> bool {
    let x_pos = x as usize % DISPLAY_X;
    let y_pos = y as usize % DISPLAY_Y;

    // Don't draw out of bounds
    let row_count = std::cmp::min(sprite.len(), DISPLAY_Y - y_pos);
    let col_count = std::cmp::min(8, DISPLAY_X - x_pos);

    let mut any_erased = false;
    for (row, sprite_byte) in sprite.iter().take(row_count).enumerate() {
        for col in 0..col_count {
            // If current sprite bit is non-zero
            if (sprite_byte & (0x80 >> col)) != 0 {
                let pixel = &mut display[y_pos + row][x_pos + col];
                let was_on = *pixel;

                // Flip the pixel
                *pixel ^= true;

                if was_on && !*pixel {
                    any_erased = true;
                }
            }
        }
    }

    any_erased
}

/// Renders the display as text, `#` for lit pixels and `.` for dark ones.
pub fn to_ascii(display: &Display<bool>) -> String {
    let mut out = String::with_capacity((DISPLAY_X + 1) * DISPLAY_Y);
    for row in display {
        out.extend(row.iter().map(|&on| if on { '#' } else { '.' }));
        out.push('\n');
    }
    out
}
