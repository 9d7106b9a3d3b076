mod articles;
mod html;
mod layout;
mod run;
#[cfg(test)]
mod tests;
mod transitory;

pub use run::run;
