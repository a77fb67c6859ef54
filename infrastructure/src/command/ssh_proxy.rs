use serde::Deserialize;
use tokio::process::Command;

/// Login node that runs the scheduler commands on our behalf.
#[derive(Debug, Clone, Deserialize)]
pub struct SshProxy {
    pub host: String,

    pub username: String,

    #[serde(default = "SshProxy::default_port")]
    pub port: u16,
}

impl SshProxy {
    pub fn default_port() -> u16 {
        22
    }

    fn username_host(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

/// An ssh proxy for command. It's transparent if not using ssh.
pub trait MaybeSsh {
    fn command(&self, program: &str, args: &[String]) -> Command;
    fn is_ssh(&self) -> bool;
}

impl<Ctx> MaybeSsh for Ctx
where
    Ctx: AsRef<Option<SshProxy>>,
{
    fn command(&self, program: &str, args: &[String]) -> Command {
        let Some(ssh) = self.as_ref() else {
            let mut command = Command::new(program);
            command.args(args);
            return command;
        };

        // The remote shell re-splits the command line.
        let remote = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ");
        let mut command = Command::new("ssh");
        command.args(["-p", &ssh.port.to_string(), &ssh.username_host(), &remote]);
        command
    }

    fn is_ssh(&self) -> bool {
        self.as_ref().is_some()
    }
}

/// POSIX shell quoting, leaving plain words untouched.
pub fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=,@%+".contains(c));
    if plain {
        s.to_owned()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
