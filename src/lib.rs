//! A small guestbook: the last ten visitor posts, kept in a JSON file and
//! served over HTTP by Iron.

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod model;

use iron::prelude::Chain;
use logger::Logger;
use router::Router;

use crate::database::PostStore;
use crate::handlers::{Handlers, JsonAfterMiddleware};

/// Builds the full middleware chain around the guestbook routes.
pub fn chain(store: PostStore) -> Chain {
    let (logger_before, logger_after) = Logger::new(None);
    let handlers = Handlers::new(store);

    let mut router = Router::new();
    router.get("/", handlers.feed, "feed");
    router.post("/", handlers.sign, "sign");

    let mut chain = Chain::new(router);
    chain.link_before(logger_before); // Should be first!
    chain.link_after(JsonAfterMiddleware);
    chain.link_after(logger_after); // Should be last!
    chain
}
