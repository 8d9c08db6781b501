//! Staleness of compiled sources through the headers they include.

use crate::e2e::*;

fn compile_buildfile(extra: &str) -> String {
    [
        COPY_RULE,
        extra,
        "source main = main.c",
        "build obj = main.o : copy main",
        "default obj",
        "",
    ]
    .join("\n")
}

#[test]
fn touching_included_header_rebuilds() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &compile_buildfile(""))?;
    space.write("main.c", "#include \"util.h\"\nint main() {}\n")?;
    space.write("util.h", "int util();\n")?;
    space.write("other.h", "")?;
    space.run_expect(&mut sbuild_command(vec![]))?;

    space.set_mtime("main.c", 1)?;
    space.set_mtime("util.h", 2)?;
    space.set_mtime("main.o", 3)?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "no work to do");

    space.set_mtime("other.h", 10)?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "no work to do");

    space.set_mtime("util.h", 10)?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "ran 1 tasks");
    Ok(())
}

#[test]
fn include_dirs_from_settings() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        &compile_buildfile("settings copy\n  include_dirs = inc\n"),
    )?;
    space.write("main.c", "#include <lib.h>\n")?;
    space.write("inc/lib.h", "#include \"nested.h\"\n")?;
    space.write("inc/nested.h", "")?;
    space.run_expect(&mut sbuild_command(vec![]))?;

    space.set_mtime("main.c", 1)?;
    space.set_mtime("inc/lib.h", 1)?;
    space.set_mtime("inc/nested.h", 1)?;
    space.set_mtime("main.o", 3)?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "no work to do");

    space.set_mtime("inc/nested.h", 5)?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "ran 1 tasks");
    Ok(())
}

#[test]
fn system_headers_are_ignored() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &compile_buildfile(""))?;
    space.write("main.c", "#include <stdio.h>\n#include \"missing.h\"\n")?;
    space.run_expect(&mut sbuild_command(vec![]))?;

    space.set_mtime("main.c", 1)?;
    space.set_mtime("main.o", 2)?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "no work to do");
    Ok(())
}
