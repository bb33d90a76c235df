use auto_message::AcceptedNotifier;
use chat_list::ChatListAggregator;
use storage::Store;

use crate::articles::ArticleService;
use crate::auth::AuthGateway;
use crate::hub::Hub;

/// Shared state handed to every route.
pub struct AppState {
    pub store: Store,
    pub hub: Hub,
    pub chat_lists: ChatListAggregator,
    pub articles: ArticleService,
    pub auth: AuthGateway,
    /// Wakes the auto-message scheduler when an appointment is accepted.
    pub accepted: AcceptedNotifier,
}
