pub mod client_ip;
pub mod dispatcher;
pub mod escape;
pub mod formatter;
pub mod geolocation;
pub mod metrics;
pub mod providers;

pub use client_ip::{clean_ip, client_ip};
pub use dispatcher::{dispatch_all, DispatchError};
pub use escape::escape_html;
pub use formatter::{build_message, format_body, EMPTY_BODY};
pub use geolocation::{GeoLocator, IpapiLocator, StaticLocator, UNKNOWN_COUNTRY};
pub use self::metrics::{get_metrics, init_metrics};
pub use providers::{ChatProvider, MockChatProvider, ProviderError, TelegramProvider};
