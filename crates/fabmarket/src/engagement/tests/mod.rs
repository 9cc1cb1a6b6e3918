mod common;
mod lifecycle;
mod reviews;
