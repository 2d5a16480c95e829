pub(crate) mod discovery;
pub(crate) mod health;
pub(crate) mod notifications;
