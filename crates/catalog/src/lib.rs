//! `bookstall-catalog` — the book catalog as the sales lifecycle sees it.

pub mod book;

pub use book::Book;
