// Assembler: raw concatenation of fetched fragments into the output file.
//
// Only valid for self-contained fragments sharing one initialization segment
// (fMP4/CMAF). Other containers must not be joined this way.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::DownloadError;

/// `prefix` with `.<extension>` appended, unless it already ends with it.
pub fn normalize_output_path(prefix: &Path, extension: &str) -> PathBuf {
    let extension = extension.trim_start_matches('.');
    let already_there = prefix
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
    if extension.is_empty() || already_there {
        return prefix.to_path_buf();
    }

    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

/// Write every file of `inputs`, in order, byte for byte into `output`.
///
/// Returns the number of bytes written. Any failure is reported against the
/// output path. Once the output has been created, a failed write removes it
/// again; a path that could not be created is left untouched.
pub async fn combine_segments<'a, I>(inputs: I, output: &Path) -> Result<u64, DownloadError>
where
    I: IntoIterator<Item = &'a Path>,
{
    let file = File::create(output)
        .await
        .map_err(|e| DownloadError::assembly(output, e))?;

    let appended = append_fragments(inputs, file, output).await;
    if appended.is_err() && tokio::fs::remove_file(output).await.is_ok() {
        debug!(path = %output.display(), "Removed partial output file");
    }
    appended
}

async fn append_fragments<'a, I>(inputs: I, file: File, output: &Path) -> Result<u64, DownloadError>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut writer = BufWriter::new(file);

    let mut total = 0u64;
    for input in inputs {
        let mut reader = File::open(input)
            .await
            .map_err(|e| DownloadError::assembly(output, e))?;
        let copied = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| DownloadError::assembly(output, e))?;
        debug!(input = %input.display(), bytes = copied, "Appended fragment");
        total += copied;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::assembly(output, e))?;

    Ok(total)
}
