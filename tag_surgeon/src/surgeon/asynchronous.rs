use super::{CancelFlag, FileSurgeon, WriteReport};
use crate::config::{WriteOptions, apply_global_options, global_options};
use crate::error::Result;
use crate::producer::ZoneProducer;
use crate::zone::ZoneRegistry;

use std::path::PathBuf;

/// Rewrite the file at `path` on a blocking thread
///
/// This is [`FileSurgeon::rewrite_path`], run through [`tokio::task::spawn_blocking`]. The
/// [`GlobalOptions`](crate::config::GlobalOptions) of the calling thread are carried over.
///
/// # Errors
///
/// * See [`FileSurgeon::rewrite_path`]
/// * The blocking task panicked or was aborted, reported as an [`std::io::Error`]
///
/// # Examples
///
/// ```rust,no_run
/// # async fn run() -> tag_surgeon::error::Result<()> {
/// use tag_surgeon::config::{ParseOptions, WriteOptions};
/// use tag_surgeon::flac::{self, FlacProducer};
/// use tag_surgeon::surgeon::rewrite_path_async;
///
/// let mut file = std::fs::File::open("song.flac")?;
/// let read = flac::read_from(&mut file, ParseOptions::new().prepare_for_writing(true))?;
///
/// if let Some(registry) = read.registry {
/// 	let mut tag = read.tag;
/// 	tag.insert("TITLE", "New title");
///
/// 	rewrite_path_async("song.flac", registry, FlacProducer::new(), tag, WriteOptions::default(), None)
/// 		.await?;
/// }
/// # Ok(()) }
/// ```
pub async fn rewrite_path_async<T, P>(
	path: impl Into<PathBuf>,
	registry: ZoneRegistry,
	mut producer: P,
	tag: T,
	options: WriteOptions,
	cancel: Option<CancelFlag>,
) -> Result<WriteReport>
where
	T: Send + 'static,
	P: ZoneProducer<T> + Send + 'static,
{
	let path = path.into();
	let global = unsafe { *global_options() };

	tokio::task::spawn_blocking(move || {
		apply_global_options(global);

		let mut cancel = cancel;
		let mut surgeon = FileSurgeon::new(options);
		if let Some(flag) = cancel.as_mut() {
			surgeon = surgeon.observer(flag);
		}

		surgeon.rewrite_path(&path, registry, &mut producer, &tag)
	})
	.await
	.map_err(std::io::Error::other)?
}
