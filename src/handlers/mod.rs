//! Resource handlers behind the gatekeeping chain.
//!
//! # Route Table
//! ```text
//! /                 exact   public     WelcomeHandler
//! /bestpic          prefix  public     CollectionHandler
//! /missedhot        prefix  public     CollectionHandler
//! /toppic           prefix  public     CollectionHandler
//! /trending         prefix  public     CollectionHandler
//! /oversize         prefix  public     CollectionHandler
//! /bewakoofbest     prefix  public     CollectionHandler
//! /custom           prefix  protected  CollectionHandler
//! /users/logout     prefix  protected  LogoutHandler
//! ```

pub mod collection;
pub mod session;

pub use collection::CollectionHandler;
pub use session::{LogoutHandler, WelcomeHandler};

use std::sync::Arc;

use crate::routing::{Access, Dispatcher};
use crate::security::AuthGate;
use crate::store::DocumentStore;

/// Catalog collections: (route prefix, collection name, list label, access).
pub const CATALOG_COLLECTIONS: &[(&str, &str, &str, Access)] = &[
    ("/bestpic", "bestpic", "Best Pic", Access::Public),
    ("/missedhot", "missedhot", "Missed Hot", Access::Public),
    ("/toppic", "toppic", "Top Pic", Access::Public),
    ("/trending", "trending", "Trending", Access::Public),
    ("/oversize", "oversize", "Over Sized", Access::Public),
    ("/bewakoofbest", "bewakoofbest", "Bewakoof Best", Access::Public),
    ("/custom", "custom", "Custom T-shirts", Access::Protected),
];

/// Build the dispatcher serving the full catalog API.
pub fn catalog_dispatcher(
    gate: Arc<AuthGate>,
    documents: Arc<dyn DocumentStore>,
    max_body: usize,
) -> Dispatcher {
    let mut builder = Dispatcher::builder(gate.clone(), max_body)
        .exact("/", Access::Public, Arc::new(WelcomeHandler))
        .prefix(
            "/users/logout",
            Access::Protected,
            Arc::new(LogoutHandler::new(gate)),
        );

    for &(prefix, collection, label, access) in CATALOG_COLLECTIONS {
        let handler = CollectionHandler::new(collection, label, documents.clone());
        builder = builder.prefix(prefix, access, Arc::new(handler));
    }
    builder.build()
}
