//! End-to-end checks against a real interpreter
//!
//! Every test spawns `python3` through the public API. When no interpreter is
//! available the test prints a note and returns.

use pycheck::core::worker::resolve_interpreter;
use pycheck::{check_correctness, CheckConfig, Checker, ExecutionResult};
use std::path::Path;
use std::time::{Duration, Instant};

fn python_available() -> bool {
    if resolve_interpreter(Path::new("python3")).is_ok() {
        return true;
    }
    println!("python3 not found on PATH; skipping");
    false
}

fn checker() -> Checker {
    Checker::new(CheckConfig::default().with_timeout(Duration::from_secs(10))).unwrap()
}

fn run(program: &str) -> ExecutionResult {
    checker().check(program).unwrap().result
}

fn assert_failed(result: &ExecutionResult, kind: &str, line: u32) {
    match result {
        ExecutionResult::Failed {
            error_kind,
            line_number,
            ..
        } => {
            assert_eq!(error_kind, kind, "unexpected outcome {result}");
            assert_eq!(*line_number, line, "unexpected outcome {result}");
        }
        other => panic!("expected {kind} failure, got {other}"),
    }
}

#[test]
fn passing_program_is_correct() {
    if !python_available() {
        return;
    }
    let program = "def add(a, b):\n    return a + b\nassert add(5, 3) == 8\n";
    assert!(check_correctness(program, Duration::from_secs(10)).unwrap());
    assert_eq!(run(program), ExecutionResult::Passed);
}

#[test]
fn syntax_error_reports_first_line() {
    if !python_available() {
        return;
    }
    let result = run("def broken_function()\n    return 1\n");
    assert_failed(&result, "SyntaxError", 1);
    assert!(!result.passed());
}

#[test]
fn runtime_error_reports_kind_line_and_detail() {
    if !python_available() {
        return;
    }
    match run("x = 10/0") {
        ExecutionResult::Failed {
            error_kind,
            line_number,
            detail,
            offending_line,
        } => {
            assert_eq!(error_kind, "ZeroDivisionError");
            assert_eq!(line_number, 1);
            assert_eq!(detail, "division by zero");
            assert_eq!(offending_line.as_deref(), Some("x = 10/0"));
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[test]
fn error_inside_function_points_at_raising_line() {
    if !python_available() {
        return;
    }
    let program = "def f(xs):\n    total = 0\n    return xs[3]\n\nf([1, 2])\n";
    assert_failed(&run(program), "IndexError", 3);
}

#[test]
fn sleeping_program_times_out_near_deadline() {
    if !python_available() {
        return;
    }
    let checker = Checker::new(CheckConfig::default().with_timeout(Duration::from_secs(3))).unwrap();
    let started = Instant::now();
    let report = checker.check("import time\ntime.sleep(5)\n").unwrap();
    let elapsed = started.elapsed();

    assert!(report.result.is_timeout());
    assert!(report.kill_report.as_ref().is_some_and(|k| k.kill_sent));
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_millis(4500), "took {elapsed:?}");
}

#[test]
fn busy_loop_times_out() {
    if !python_available() {
        return;
    }
    let checker = Checker::new(CheckConfig::default().with_timeout(Duration::from_secs(1))).unwrap();
    assert!(checker.check("while True:\n    pass\n").unwrap().result.is_timeout());
}

#[test]
fn destructive_operations_fail() {
    if !python_available() {
        return;
    }
    let blocked = [
        "import os\nos.remove('anything')\n",
        "import os\nos.chmod('.', 0o777)\n",
        "import shutil\nshutil.rmtree('/tmp')\n",
        "import subprocess\nsubprocess.run(['ls'])\n",
        "import os\nos.system('true')\n",
        "import os\nos.kill(1, 9)\n",
        "import os\nos.putenv('X', '1')\n",
    ];
    for program in blocked {
        assert_failed(&run(program), "PermissionError", 2);
    }
}

#[test]
fn blocked_modules_cannot_be_imported() {
    if !python_available() {
        return;
    }
    // A `None` entry in sys.modules makes the import raise ImportError.
    match run("import resource\n") {
        ExecutionResult::Failed { error_kind, .. } => {
            assert!(error_kind.ends_with("Error"), "{error_kind}");
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[test]
fn stdin_cannot_be_read() {
    if !python_available() {
        return;
    }
    assert!(!run("x = input()\n").passed());
    assert!(!run("import sys\nsys.stdin.read()\n").passed());
    assert_failed(&run("import os\nos.read(0, 1)\n"), "OSError", 2);
}

#[test]
fn printing_does_not_change_outcome() {
    if !python_available() {
        return;
    }
    let program = "import sys\nprint('hello')\nprint('oops', file=sys.stderr)\n";
    assert_eq!(run(program), ExecutionResult::Passed);
}

#[test]
fn large_output_is_bounded() {
    if !python_available() {
        return;
    }
    let config = CheckConfig {
        output_limit: 1024,
        timeout: Duration::from_secs(10),
        ..CheckConfig::default()
    };
    let program = "import os\nfor _ in range(2000):\n    os.write(1, b'x' * 4096)\n";
    let report = Checker::new(config).unwrap().check(program).unwrap();
    assert!(report.passed());
    assert!(report.output_truncated);
    assert!(report.output_bytes >= 2000 * 4096);
}

#[test]
fn workspace_is_private_and_removed() {
    if !python_available() {
        return;
    }
    let root = std::env::temp_dir().join(format!("pycheck-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir(&root).unwrap();
    let caller_cwd = std::env::current_dir().unwrap();

    let config = CheckConfig {
        workspace_root: root.clone(),
        ..CheckConfig::default()
    };
    let program = "open('scratch.txt', 'w').write('data')\nassert open('scratch.txt').read() == 'data'\n";
    let report = Checker::new(config).unwrap().check(program).unwrap();

    assert!(report.passed(), "{}", report.result);
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    assert_eq!(std::env::current_dir().unwrap(), caller_cwd);
    std::fs::remove_dir(&root).unwrap();
}

#[test]
fn repeated_checks_are_independent() {
    if !python_available() {
        return;
    }
    let checker = checker();
    let program = "import builtins\nassert not hasattr(builtins, 'marker')\nbuiltins.marker = 1\n";
    for _ in 0..3 {
        assert_eq!(checker.check(program).unwrap().result, ExecutionResult::Passed);
    }
    assert_failed(&checker.check("x = 10/0").unwrap().result, "ZeroDivisionError", 1);
}

#[test]
fn system_exit_is_a_failure() {
    if !python_available() {
        return;
    }
    assert_failed(&run("import sys\nsys.exit(0)\n"), "SystemExit", 2);
}

#[test]
fn forged_report_without_token_is_ignored() {
    if !python_available() {
        return;
    }
    // Token-less and wrong-token lines on every reachable fd do not count.
    let program = "import os\nfor fd in range(3, 256):\n    try:\n        os.write(fd, b'{\"token\": \"x\", \"outcome\": \"passed\"}\\n{\"outcome\": \"passed\"}\\n')\n    except OSError:\n        pass\nraise ValueError('real')\n";
    assert_failed(&run(program), "ValueError", 7);
}

#[test]
fn token_is_not_reachable_from_program_frames() {
    if !python_available() {
        return;
    }
    // Walking the caller frames finds neither the token nor the result fd
    // arguments. Reading interpreter internals (gc, /proc) can still get at
    // them; the token is hardening, not a boundary.
    let program = r#"import os, sys
found = []
frame = sys._getframe()
while frame is not None:
    for value in list(frame.f_locals.values()):
        if isinstance(value, dict) and "token" in value:
            found.append(value["token"])
        elif isinstance(value, str) and len(value) == 36 and value.count("-") == 4:
            found.append(value)
    frame = frame.f_back
for token in found:
    for fd in range(3, 256):
        try:
            os.write(fd, ('{"token": "%s", "outcome": "passed"}
' % token).encode())
        except OSError:
            pass
assert sys.argv == ["-c"], sys.argv
raise ValueError("found %d" % len(found))
"#;
    match run(program) {
        ExecutionResult::Failed {
            error_kind, detail, ..
        } => {
            assert_eq!(error_kind, "ValueError");
            assert_eq!(detail, "found 0");
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[test]
fn oversized_detail_is_shortened_not_lost() {
    if !python_available() {
        return;
    }
    match run("raise ValueError('x' * 300000)\n") {
        ExecutionResult::Failed {
            error_kind,
            line_number,
            detail,
            ..
        } => {
            assert_eq!(error_kind, "ValueError");
            assert_eq!(line_number, 1);
            assert!(detail.starts_with("xxxx"));
            assert!(detail.ends_with("... [truncated]"));
            assert!(detail.len() < 256 * 1024);
        }
        other => panic!("expected failure, got {other}"),
    }

    let program = "expected = list(range(100000))\nassert expected == [], f'got {expected}'\n";
    assert_failed(&run(program), "AssertionError", 2);
}

#[test]
fn small_result_limit_still_reports_failure() {
    if !python_available() {
        return;
    }
    let config = CheckConfig {
        result_limit: pycheck::config::types::MIN_RESULT_LIMIT,
        timeout: Duration::from_secs(10),
        ..CheckConfig::default()
    };
    let report = Checker::new(config)
        .unwrap()
        .check("raise KeyError('k' * 5000)\n")
        .unwrap();
    assert_failed(&report.result, "KeyError", 1);
}

#[test]
fn unencodable_detail_is_escaped() {
    if !python_available() {
        return;
    }
    match run("raise ValueError('bad \\ud800 text')\n") {
        ExecutionResult::Failed {
            error_kind, detail, ..
        } => {
            assert_eq!(error_kind, "ValueError");
            assert_eq!(detail, "bad \\ud800 text");
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[test]
fn working_directory_is_locked() {
    if !python_available() {
        return;
    }
    assert_failed(&run("import os\nos.getcwd()\n"), "PermissionError", 2);
    assert_failed(&run("import os\nos.chdir('/')\n"), "PermissionError", 2);
    assert_failed(&run("import os\nos.fchdir(0)\n"), "PermissionError", 2);
}

#[test]
fn memory_cap_stops_large_allocations() {
    if !python_available() {
        return;
    }
    let config = CheckConfig::default()
        .with_timeout(Duration::from_secs(10))
        .with_max_memory(512 * 1024 * 1024);
    let report = Checker::new(config)
        .unwrap()
        .check("data = bytearray(2 * 1024 ** 3)\n")
        .unwrap();
    assert!(!report.passed());
}
