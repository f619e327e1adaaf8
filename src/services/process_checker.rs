use std::collections::BTreeSet;
use std::path::Path;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// Linux keeps at most 15 bytes of a process name (`comm`)
const COMM_LEN: usize = 15;

fn scan() -> System {
    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::nothing());

    // Possibly cut names need exe and cmdline to recover the full one
    let truncated: Vec<Pid> = sys
        .processes()
        .iter()
        .filter(|(_, process)| process.name().len() == COMM_LEN)
        .map(|(pid, _)| *pid)
        .collect();
    if !truncated.is_empty() {
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&truncated),
            true,
            ProcessRefreshKind::nothing()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );
    }
    sys
}

/// Process name with a kernel-truncated `comm` extended from the executable
/// path or `argv[0]`, when either starts with the truncated name.
fn full_name(process: &Process) -> String {
    let name = process.name().to_string_lossy().into_owned();
    if name.len() != COMM_LEN {
        return name;
    }

    let from_exe = process.exe().and_then(Path::file_name);
    let from_argv0 = process
        .cmd()
        .first()
        .and_then(|arg0| Path::new(arg0).file_name());

    from_exe
        .into_iter()
        .chain(from_argv0)
        .map(|candidate| candidate.to_string_lossy().into_owned())
        .find(|candidate| candidate.len() > COMM_LEN && candidate.starts_with(&name))
        .unwrap_or(name)
}

/// Names of all processes currently in the process table, sorted and de-duplicated.
///
/// A process that exits while the table is being read is simply absent from
/// the snapshot; empty names (kernel threads on some platforms) are skipped.
pub fn running_process_names() -> BTreeSet<String> {
    let sys = scan();
    let names: BTreeSet<String> = sys
        .processes()
        .values()
        .map(full_name)
        .filter(|name| !name.is_empty())
        .collect();

    log::debug!("Scanned process table: {} distinct names", names.len());
    names
}

/// Number of processes whose name is exactly `name`
pub fn count_processes(name: &str) -> usize {
    let sys = scan();
    sys.processes()
        .values()
        .filter(|process| full_name(process) == name)
        .count()
}

pub fn hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}
