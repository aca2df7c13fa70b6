//! Fixed lookup tables for Confluence presentation markup.

/// Unicode rendering of Confluence's built-in emoticons.
pub(crate) fn emoji_for(name: &str) -> Option<&'static str> {
    let emoji = match name {
        "smile" => "\u{1f642}",
        "sad" => "\u{1f641}",
        "cheeky" => "\u{1f61b}",
        "laugh" => "\u{1f604}",
        "wink" => "\u{1f609}",
        "thumbs-up" => "\u{1f44d}",
        "thumbs-down" => "\u{1f44e}",
        "information" => "\u{2139}\u{fe0f}",
        "tick" => "\u{2705}",
        "cross" => "\u{274c}",
        "warning" => "\u{26a0}\u{fe0f}",
        "plus" => "\u{2795}",
        "minus" => "\u{2796}",
        "question" => "\u{2753}",
        "light-on" | "light-off" => "\u{1f4a1}",
        "yellow-star" | "red-star" | "green-star" | "blue-star" => "\u{2b50}",
        "heart" => "\u{2764}\u{fe0f}",
        "broken-heart" => "\u{1f494}",
        _ => return None,
    };
    Some(emoji)
}

/// Background color for Confluence's `highlight-*` span classes.
pub(crate) fn highlight_class_color(class: &str) -> Option<&'static str> {
    let color = match class {
        "highlight-yellow" => "yellow",
        "highlight-red" => "#ffcccb",
        "highlight-green" => "#90ee90",
        "highlight-blue" => "#add8e6",
        "highlight-grey" => "#d3d3d3",
        "highlight-teal" => "#008080",
        "highlight-purple" => "#dda0dd",
        _ => return None,
    };
    Some(color)
}
