//! confluence2md core: pure parsing and naming helpers, no IO.
mod naming;
mod page_ref;

pub use naming::{
    is_image_filename, resolve_output_path, safe_attachment_name, sanitize_filename,
    DEFAULT_IMAGE_DIR, IMAGE_EXTENSIONS,
};
pub use page_ref::{parse_page_ref, PageRef, PageTarget, ParseError};
