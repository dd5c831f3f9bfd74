mod display;
mod test_utils;
mod variables;
