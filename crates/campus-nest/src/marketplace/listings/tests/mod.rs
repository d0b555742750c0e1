mod common;
mod routing;
mod verification;
