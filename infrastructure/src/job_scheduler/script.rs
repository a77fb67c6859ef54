use std::fmt::Write;

use domain::model::entity::Job;

use crate::command::shell_quote;

const DEFAULT_SHEBANG: &str = "#!/bin/bash";

/// Produces the script handed to the submit command on stdin.
///
/// Environment exports go after the leading comment block so that
/// `#SBATCH`/`#PBS` directives in the caller's script stay effective.
pub fn render_script(job: &Job) -> String {
    let body = job.script();
    let (shebang, body) = match body.strip_prefix("#!") {
        Some(_) => body.split_once('\n').unwrap_or((body, "")),
        None => (DEFAULT_SHEBANG, body),
    };

    let lines: Vec<&str> = body.lines().collect();
    let split = lines
        .iter()
        .position(|l| {
            let l = l.trim();
            !l.is_empty() && !l.starts_with('#')
        })
        .unwrap_or(lines.len());

    let mut script = String::with_capacity(body.len() + 64);
    script.push_str(shebang.trim_end());
    script.push('\n');
    for line in &lines[..split] {
        script.push_str(line);
        script.push('\n');
    }
    for (k, v) in job.env_vars() {
        let _ = writeln!(script, "export {k}={}", shell_quote(v));
    }
    for line in &lines[split..] {
        script.push_str(line);
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use domain::model::entity::Job;
    use indoc::indoc;

    use super::render_script;

    #[test]
    fn adds_shebang() {
        let job = Job::new("echo hi", "t1");
        assert_eq!(render_script(&job), "#!/bin/bash\necho hi\n");
    }

    #[test]
    fn exports_after_directives() {
        let script = indoc! {"
            #!/bin/sh
            #SBATCH --exclusive

            module load GCC
            eb foo.eb
        "};
        let job = Job::new(script, "t1").with_env_vars([("B", "two words"), ("A", "1")]);
        let expected = indoc! {"
            #!/bin/sh
            #SBATCH --exclusive

            export A=1
            export B='two words'
            module load GCC
            eb foo.eb
        "};
        assert_eq!(render_script(&job), expected);
    }

    #[test]
    fn only_comments() {
        let job = Job::new("#!/bin/bash\n# nothing", "t1").with_env_vars([("A", "x")]);
        assert_eq!(render_script(&job), "#!/bin/bash\n# nothing\nexport A=x\n");
    }
}
