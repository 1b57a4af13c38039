//! Child process execution with captured output.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use crate::{BuildError, Console, Speaker};

/// Captured output beyond this limit is a hard error.
pub const MAX_CAPTURED_OUTPUT: usize = 5 * 1024 * 1024;

/// Spawn `program` with `args` in `cwd`, capture its merged stdout and
/// stderr, and wait for termination.
///
/// Normal exits are returned whatever their code; spawn failures, abnormal
/// termination (signals) and oversized output are hard errors. Both streams
/// are consumed to EOF before the size limit is enforced, so a chatty child
/// never deadlocks on a full pipe; ordering between the two streams is not
/// preserved in the capture.
pub fn run_command(
    console: &Console,
    who: Speaker,
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<(i32, String), BuildError> {
    console.verbose_line(who, &format!("{program} {}", args.join(" ")));

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BuildError::CommandSpawn {
            program: program.to_string(),
            source,
        })?;

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");

    let (captured, stderr_result) = thread::scope(|scope| {
        let stderr_reader = scope.spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).map(|_| buf)
        });

        let mut buf = Vec::new();
        let stdout_result = stdout.read_to_end(&mut buf).map(|_| buf);
        (
            stdout_result,
            stderr_reader.join().expect("stderr reader does not panic"),
        )
    });

    let mut captured = captured?;
    captured.extend_from_slice(&stderr_result?);

    let status = child.wait()?;

    if captured.len() > MAX_CAPTURED_OUTPUT {
        return Err(BuildError::OutputOverflow {
            program: program.to_string(),
            limit: MAX_CAPTURED_OUTPUT,
        });
    }

    let captured = String::from_utf8_lossy(&captured).into_owned();
    if !captured.is_empty() {
        console.line(who, &captured);
    }

    let code = status.code().ok_or_else(|| BuildError::AbnormalExit {
        program: program.to_string(),
    })?;

    Ok((code, captured))
}
