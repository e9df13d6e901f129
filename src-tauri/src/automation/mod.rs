pub mod copy_method;
pub mod desktop;
pub mod events;
pub mod newline;
pub mod orchestrator;
pub mod validator;

#[cfg(test)]
pub mod test_support;
