/// Symbols the terminal host draws around the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyphs {
    /// Caret drawn on an empty cell (past the last base of a row).
    pub caret: char,
    pub scroll_track: char,
    pub scroll_thumb: char,
    pub ellipsis: char,
}

pub fn select(fancy_requested: bool) -> Glyphs {
    if fancy_requested {
        fancy()
    } else {
        ascii()
    }
}

fn ascii() -> Glyphs {
    Glyphs {
        caret: '|',
        scroll_track: ':',
        scroll_thumb: '#',
        ellipsis: '~',
    }
}

fn fancy() -> Glyphs {
    Glyphs {
        caret: '▏',
        scroll_track: '│',
        scroll_thumb: '█',
        ellipsis: '…',
    }
}
