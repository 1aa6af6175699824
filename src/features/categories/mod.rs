//! Category administration.
//!
//! Categories form a forest through their optional `parent` pointer. The
//! tree is rebuilt from the datastore for every request that needs it, and a
//! parent change is accepted only when it keeps the forest loop-free.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/categories` | List categories (flat or `?tree=true`) |
//! | POST | `/api/categories` | Create a category from form state |
//! | POST | `/api/categories/parent-check` | Validate a parent selection |
//! | GET | `/api/categories/{id}` | Get a category |
//! | PUT | `/api/categories/{id}` | Save changed fields |
//! | GET | `/api/categories/{id}/form` | Load form state |
//! | POST | `/api/categories/{id}/disable` | Soft-disable (needs `confirm: true`) |

pub mod dtos;
pub mod form;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod tree;

pub use services::CategoryService;
