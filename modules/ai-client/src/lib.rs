pub mod claude;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use traits::{ChatModel, UnconfiguredModel};
pub use util::{parse_json_reply, strip_code_blocks, truncate_to_char_boundary};
