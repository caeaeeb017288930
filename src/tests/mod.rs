mod default_fallback;
mod helper;
