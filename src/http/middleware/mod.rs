mod login_required;
mod tweet_owner;

pub use login_required::require_login;
pub use tweet_owner::require_tweet_owner;
