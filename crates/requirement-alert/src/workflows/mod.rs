pub mod requirements;
