mod runner;
mod ssh_proxy;

pub use self::{
    runner::{run, CommandError, CommandOutput},
    ssh_proxy::{shell_quote, MaybeSsh, SshProxy},
};
