//! The standard CGA/EGA/VGA 16-colour palette.

/// Default palette as RGB triples, indexed by the 4-bit pixel value.
///
/// The EGA stream carries no palette of its own; the engine assumed these
/// colours, so they are what decoded images are rendered with.
pub const EGA_PALETTE: [[u8; 3]; 16] = [
    [0x00, 0x00, 0x00], // black
    [0x00, 0x00, 0xAA], // blue
    [0x00, 0xAA, 0x00], // green
    [0x00, 0xAA, 0xAA], // cyan
    [0xAA, 0x00, 0x00], // red
    [0xAA, 0x00, 0xAA], // magenta
    [0xAA, 0x55, 0x00], // brown
    [0xAA, 0xAA, 0xAA], // light grey
    [0x55, 0x55, 0x55], // dark grey
    [0x55, 0x55, 0xFF], // light blue
    [0x55, 0xFF, 0x55], // light green
    [0x55, 0xFF, 0xFF], // light cyan
    [0xFF, 0x55, 0x55], // light red
    [0xFF, 0x55, 0xFF], // light magenta
    [0xFF, 0xFF, 0x55], // yellow
    [0xFF, 0xFF, 0xFF], // white
];
