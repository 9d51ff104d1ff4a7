// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    assert_cmd::Command,
    assert_fs::{prelude::*, TempDir},
    indoc::indoc,
    predicates::prelude::*,
};

fn srcpack() -> Result<Command> {
    Ok(Command::cargo_bin("srcpack")?)
}

fn fixture() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;

    temp_dir.child("src/A.pkg").write_str("line1\nline2\n")?;
    temp_dir.child("src/B.pkg").write_str("x\n")?;
    temp_dir.child("src/util/strings.pkg").write_str(indoc! {"
        # String helpers.
        def upper(s):

            return s.upper()
    "})?;
    temp_dir.child("preamble.txt").write_str("#!/usr/bin/env host\n")?;

    Ok(temp_dir)
}

fn no_args_fails() -> Result<()> {
    srcpack()?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));

    Ok(())
}

fn pack_to_stdout() -> Result<()> {
    let temp_dir = fixture()?;

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["pack", "-I", "src", "B.pkg", "A.pkg"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(indoc! {"
            #%srcpack-bootstrap v1
            #%resolver position=front extension=.pkg trace-env=SRCPACK_TRACE
            #%resources 2
            #%srcpack v1 entries=2 lines=3
            #%toc 14 12 0;0 A.pkg
            #%toc 40 2 1;2 B.pkg
            #%data
            #%entry A.pkg
            line1
            line2
            #%entry B.pkg
            x
        "}));

    Ok(())
}

fn pack_list_resolve_locate() -> Result<()> {
    let temp_dir = fixture()?;
    let artifact = temp_dir.child("app.run");

    srcpack()?
        .current_dir(temp_dir.path())
        .args([
            "pack",
            "-I",
            "src",
            "--preamble",
            "preamble.txt",
            "-o",
            "app.run",
            "A.pkg",
            "B.pkg",
        ])
        .assert()
        .success();

    artifact.assert(predicate::str::starts_with("#!/usr/bin/env host\n#%srcpack-bootstrap v1\n"));

    // 4 lines of preamble and bootstrap, 4 of header and TOC, then A's delimiter.
    srcpack()?
        .arg("list")
        .arg(artifact.path())
        .assert()
        .success()
        .stdout("0\t10\t12\tA.pkg\n1\t13\t2\tB.pkg\n");

    srcpack()?
        .arg("resolve")
        .arg(artifact.path())
        .arg("A.pkg")
        .assert()
        .success()
        .stdout("line1\nline2\n");

    srcpack()?
        .args(["resolve", "--annotate"])
        .arg(artifact.path())
        .arg("B.pkg")
        .assert()
        .success()
        .stdout(format!("#line 13 \"{}\"\nx\n", artifact.path().display()));

    srcpack()?
        .arg("resolve")
        .arg(artifact.path())
        .arg("C.pkg")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("C.pkg not found"));

    srcpack()?
        .arg("locate-line")
        .arg(artifact.path())
        .arg("11")
        .assert()
        .success()
        .stdout("A.pkg:2\n");

    srcpack()?
        .arg("locate-line")
        .arg(artifact.path())
        .arg("12")
        .assert()
        .code(1);

    Ok(())
}

fn resolve_falls_back_to_search_path() -> Result<()> {
    let temp_dir = fixture()?;
    temp_dir.child("disk/C.pkg").write_str("from disk\n")?;
    temp_dir.child("disk/A.pkg").write_str("shadowed\n")?;

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["pack", "-I", "src", "-o", "app.run", "A.pkg"])
        .assert()
        .success();

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["resolve", "-I", "disk", "app.run", "C"])
        .assert()
        .success()
        .stdout("from disk\n");

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["resolve", "-I", "disk", "app.run", "A"])
        .assert()
        .success()
        .stdout("line1\nline2\n");

    Ok(())
}

fn output_exists_requires_overwrite() -> Result<()> {
    let temp_dir = fixture()?;
    let output = temp_dir.child("app.run");
    output.write_str("precious")?;

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["pack", "-I", "src", "-o", "app.run", "A.pkg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists").and(predicate::str::contains("--overwrite")));

    output.assert("precious");

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["pack", "-I", "src", "-o", "app.run", "--overwrite", "A.pkg"])
        .assert()
        .success();

    output.assert(predicate::str::contains("#%entry A.pkg\nline1\n"));

    Ok(())
}

fn stripping_changes_line_offsets() -> Result<()> {
    let temp_dir = fixture()?;
    temp_dir.child("src/blank.pkg").write_str("a\n\nb\n")?;

    srcpack()?
        .current_dir(temp_dir.path())
        .args([
            "pack",
            "-I",
            "src",
            "--strip-whitespace",
            "--strip-comments",
            "blank",
            "util.strings",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("#%toc 18 4 0;0 blank.pkg\n")
                .and(predicate::str::contains(" 1;2 util/strings.pkg\n"))
                .and(predicate::str::contains(
                    "#%entry util/strings.pkg\ndef upper(s):\n    return s.upper()\n",
                )),
        );

    Ok(())
}

fn config_file() -> Result<()> {
    let temp_dir = fixture()?;
    temp_dir.child("srcpack.json").write_str(indoc! {r##"
        {
            "resources": ["util/"],
            "search_paths": ["src"],
            "resolver_position": "back",
            "line_marker": "#"
        }
    "##})?;

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["pack", "--config", "srcpack.json", "-o", "lib.run"])
        .assert()
        .success();

    temp_dir.child("lib.run").assert(
        predicate::str::contains("position=back")
            .and(predicate::str::contains("marker=#"))
            .and(predicate::str::contains("##%entry").not()),
    );

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["resolve", "lib.run", "util.strings"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# String helpers.\n"));

    Ok(())
}

fn missing_resource_fails() -> Result<()> {
    let temp_dir = fixture()?;

    srcpack()?
        .current_dir(temp_dir.path())
        .args(["pack", "-I", "src", "-o", "app.run", "A.pkg", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("resource nope not found"));

    temp_dir.child("app.run").assert(predicate::path::missing());

    Ok(())
}

fn run() -> Result<()> {
    no_args_fails()?;
    pack_to_stdout()?;
    pack_list_resolve_locate()?;
    resolve_falls_back_to_search_path()?;
    output_exists_requires_overwrite()?;
    stripping_changes_line_offsets()?;
    config_file()?;
    missing_resource_fails()?;

    Ok(())
}

fn main() {
    run().expect("all tests should pass");
}
