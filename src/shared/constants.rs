// =============================================================================
// COLLECTION NAMES
// =============================================================================

pub const CATEGORY_CLASS: &str = "Category";

pub const FAQ_CLASS: &str = "FAQ";

pub const WEBHOOK_CLASS: &str = "Webhook";

pub const TRIGGER_CLASS: &str = "Trigger";

// =============================================================================
// CLIENT ROUTES
// =============================================================================

/// Where the admin UI navigates after a category is saved or disabled
pub const CATEGORY_LIST_PATH: &str = "/settings/categories";

/// Prefix owned by the JSON API; everything else falls through to the HTML shell
pub const API_PREFIX: &str = "/api";
