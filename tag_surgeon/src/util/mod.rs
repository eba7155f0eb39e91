pub(crate) mod alloc;
pub mod io;
pub(crate) mod synchsafe;
pub(crate) mod text;
