use std::path::{Path, PathBuf};

use c2md_core::{resolve_output_path, sanitize_filename, PageRef, PageTarget, DEFAULT_IMAGE_DIR};
use c2md_engine::{
    build_note, ensure_output_dir, AtomicFileWriter, ConvertOptions, Converter, NoteMetadata,
    PageData, PageSource, StorageConverter,
};
use c2md_logging::{c2md_info, c2md_warn};
use serde::Serialize;

use crate::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub json: bool,
    pub no_images: bool,
    pub obsidian: bool,
    pub frontmatter: bool,
    /// Images land in `<working_dir>/assets` when Markdown goes to stdout.
    pub working_dir: PathBuf,
}

/// What the caller still has to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Json(String),
    Written(PathBuf),
    Markdown(String),
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    title: &'a str,
    page_id: &'a str,
    url: &'a str,
    markdown: &'a str,
}

pub async fn resolve_page_id(
    source: &dyn PageSource,
    page_ref: &PageRef,
) -> Result<String, AppError> {
    match &page_ref.target {
        PageTarget::Id(id) => Ok(id.clone()),
        PageTarget::ShortLink(token) => {
            c2md_info!("Resolving short link {}", token);
            source
                .resolve_short_link(token)
                .await
                .map_err(AppError::ShortLink)
        }
        PageTarget::Title(title) => {
            let space = page_ref.space_key.as_deref().unwrap_or_default();
            c2md_info!("Looking up \"{}\" in space {}", title, space);
            source
                .resolve_title(space, title)
                .await
                .map_err(AppError::Title)
        }
    }
}

/// Resolve, fetch, convert and write one page.
pub async fn run(
    source: &dyn PageSource,
    page_ref: &PageRef,
    options: &RunOptions,
    fetched_utc: &str,
) -> Result<Outcome, AppError> {
    let page_id = resolve_page_id(source, page_ref).await?;
    let page = source.fetch_page(&page_id).await.map_err(AppError::Fetch)?;

    let download_images = !options.no_images && !options.json;
    let out_path = match &options.output {
        Some(output) if !options.json => Some(resolve_output_path(output, &page.title)),
        _ => None,
    };
    // Next to a note, images go into a folder named like the note.
    let image_dir = if out_path.is_some() {
        sanitize_filename(&page.title)
    } else {
        DEFAULT_IMAGE_DIR.to_string()
    };

    let converter = StorageConverter::new(ConvertOptions {
        download_images,
        image_dir: image_dir.clone(),
        obsidian: options.obsidian,
    });
    let mut markdown = converter.to_markdown(&page.html);
    if options.frontmatter {
        let meta = NoteMetadata {
            title: &page.title,
            page_id: &page.page_id,
            source_url: &page.url,
            version: page.version,
            fetched_utc,
        };
        markdown = build_note(&meta, &markdown);
    }

    if download_images {
        let assets_dir = match &out_path {
            Some(path) => parent_dir(path).join(&image_dir),
            None => options.working_dir.join(DEFAULT_IMAGE_DIR),
        };
        download_images_into(source, &page, &assets_dir).await;
    }

    if options.json {
        let payload = JsonOutput {
            title: &page.title,
            page_id: &page.page_id,
            url: &page.url,
            markdown: &markdown,
        };
        return Ok(Outcome::Json(serde_json::to_string_pretty(&payload)?));
    }

    if let Some(path) = out_path {
        let dir = parent_dir(&path);
        ensure_output_dir(&dir)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.md", sanitize_filename(&page.title)));
        let written = AtomicFileWriter::new(dir).write(&filename, markdown.as_bytes())?;
        return Ok(Outcome::Written(written));
    }

    Ok(Outcome::Markdown(markdown))
}

/// Failed downloads are reported and skipped.
async fn download_images_into(source: &dyn PageSource, page: &PageData, dir: &Path) {
    for attachment in page.image_attachments() {
        match source.download_attachment(attachment, dir).await {
            Ok(path) => c2md_info!("Downloaded {}", path.display()),
            Err(err) => c2md_warn!("Failed to download {}: {}", attachment.filename, err),
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
