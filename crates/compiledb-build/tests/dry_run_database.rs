//! End-to-end: fake make + fake toolchain -> compile_commands.json.

#![cfg(unix)]

use compiledb_build::{
    run, CompileCommands, LogParser, MakeCommand, SystemIncludeResolver, DATABASE_FILE_NAME,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Lay out `<prefix>/bin/arm-none-eabi-gcc` with two bundled include dirs.
fn fake_toolchain(prefix: &Path) -> PathBuf {
    std::fs::create_dir_all(prefix.join("bin")).unwrap();
    std::fs::create_dir_all(prefix.join("arm-none-eabi/include")).unwrap();
    std::fs::create_dir_all(prefix.join("lib/gcc/arm-none-eabi/include")).unwrap();
    std::fs::create_dir_all(prefix.join("share/doc")).unwrap();

    let gcc = prefix.join("bin/arm-none-eabi-gcc");
    std::fs::write(&gcc, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&gcc, std::fs::Permissions::from_mode(0o755)).unwrap();
    gcc
}

fn fake_make(root: &Path, gcc: &Path) -> MakeCommand {
    fake_make_with(root, &gcc.display().to_string())
}

fn fake_make_with(root: &Path, gcc: &str) -> MakeCommand {
    let script = format!(
        r#"
echo "QMK Firmware"
printf '%s\n' 'printf "Compiling: quantum/main.c" | awk '"'"'{{ printf "%-99s", $0; }}'"'"''
printf '%s\n' 'LOG=$({gcc} -c -mthumb -mno-thumb-interwork -DQMK_KEYBOARD=\"planck/rev6\" quantum/main.c -o main.o && true)'
printf '%s\n' 'printf "Compiling: quantum/dangling.c"'
"#,
        gcc = gcc
    );
    std::fs::write(root.join("make.sh"), script).unwrap();
    MakeCommand::new("sh", ["make.sh", "-n", "planck/rev6:default"])
}

#[test]
fn test_database_from_dry_run() {
    let root = tempfile::tempdir().unwrap();
    let toolchain = tempfile::tempdir().unwrap();
    let gcc = fake_toolchain(toolchain.path());
    let command = fake_make(root.path(), &gcc);

    let mut parser = LogParser::with_resolver(root.path(), SystemIncludeResolver::new());
    let db = run(root.path(), &command, &mut parser).unwrap();

    assert_eq!(db.len(), 1);
    let record = &db.commands()[0];
    assert_eq!(record.file, "quantum/main.c");
    assert_eq!(record.directory, root.path());

    let prefix = toolchain.path().canonicalize().unwrap();
    let mut expected: Vec<String> = vec![
        gcc.display().to_string(),
        "-c".to_string(),
        "-mthumb".to_string(),
        "-DQMK_KEYBOARD=\"planck/rev6\"".to_string(),
        "quantum/main.c".to_string(),
        "-o".to_string(),
        "main.o".to_string(),
    ];
    expected.push(format!("-I{}", prefix.join("arm-none-eabi/include").display()));
    assert_eq!(record.arguments().unwrap(), expected);

    let path = root.path().join(DATABASE_FILE_NAME);
    db.write_to_file(&path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.starts_with("[\n    {\n        \"directory\": "));
    assert_eq!(CompileCommands::from_file(&path).unwrap(), db);
}

#[test]
fn test_relative_compiler_resolved_from_root() {
    let root = tempfile::tempdir().unwrap();
    fake_toolchain(&root.path().join("toolchain"));
    let command = fake_make_with(root.path(), "./toolchain/bin/arm-none-eabi-gcc");

    // make runs in `root`, not in the test's working directory
    let mut parser = LogParser::new(root.path());
    let db = run(root.path(), &command, &mut parser).unwrap();

    let prefix = root.path().join("toolchain").canonicalize().unwrap();
    let args = db.commands()[0].arguments().unwrap();
    assert_eq!(args[0], "./toolchain/bin/arm-none-eabi-gcc");
    assert_eq!(
        args.last().unwrap(),
        &format!("-I{}", prefix.join("arm-none-eabi/include").display())
    );
}
