#![allow(missing_docs)]

mod flac;
mod mp4;
mod mpeg;
pub(crate) mod util;
