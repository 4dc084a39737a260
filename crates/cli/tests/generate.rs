use modulizer_cli::GenerateArgs;
use modulizer_cli::generate::generate;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Installs `group:name:version` into a Maven layout with the given classes and POM dependencies.
fn install(repo: &Path, group: &str, name: &str, classes: &[&str], dependencies: &str) {
    let dir = repo.join(group.replace('.', "/")).join(name).join("1.0");
    fs::create_dir_all(&dir).unwrap();

    let mut zip = zip::ZipWriter::new(File::create(dir.join(format!("{}-1.0.jar", name))).unwrap());
    for class in classes {
        zip.start_file(*class, SimpleFileOptions::default()).unwrap();
        zip.write_all(b"\xCA\xFE\xBA\xBE").unwrap();
    }
    zip.finish().unwrap();

    fs::write(
        dir.join(format!("{}-1.0.pom", name)),
        format!(
            "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>1.0</version>\
             <dependencies>{}</dependencies></project>",
            group, name, dependencies
        ),
    )
    .unwrap();
}

fn dependency(name: &str, extra: &str) -> String {
    format!(
        "<dependency><groupId>com.example</groupId><artifactId>{}</artifactId>\
         <version>1.0</version>{}</dependency>",
        name, extra
    )
}

fn args(config: PathBuf) -> GenerateArgs {
    GenerateArgs {
        config,
        output: None,
        policy: None,
        parallel: false,
        artifact: None,
        module_name: None,
        exports: None,
        additional_dependencies: None,
        add_service_uses: false,
    }
}

struct Workspace {
    _temp: tempfile::TempDir,
    config: PathBuf,
    output: PathBuf,
}

fn workspace() -> Workspace {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("repo");
    let output = temp.path().join("out");

    install(
        &repo,
        "com.example",
        "a",
        &["com/example/a/api/Api.class", "com/example/a/internal/Impl.class"],
        &format!(
            "{}{}{}",
            dependency("b", ""),
            dependency("c", "<scope>test</scope>"),
            dependency("d", "<optional>true</optional>")
        ),
    );
    install(&repo, "com.example", "b", &["com/example/b/B.class"], "");
    install(&repo, "com.example", "c", &["com/example/c/C.class"], "");
    install(&repo, "com.example", "d", &["com/example/d/D.class"], "");

    let config = temp.path().join("batch.json");
    fs::write(
        &config,
        format!(
            r#"{{
                "outputDirectory": {:?},
                "repository": {{ "local": {:?} }},
                "modules": [
                    {{ "artifact": "com.example:a:1.0",
                       "moduleInfo": {{ "name": "mod.a", "exports": "com.example.a.*; !*.internal" }} }},
                    {{ "artifact": "com.example:b:1.0",
                       "moduleInfo": {{ "name": "mod.b", "exports": "*" }} }}
                ]
            }}"#,
            output.display().to_string(),
            repo.display().to_string()
        ),
    )
    .unwrap();

    Workspace {
        _temp: temp,
        config,
        output,
    }
}

#[test]
fn test_generate_from_maven_repository() {
    let ws = workspace();

    let report = generate(args(ws.config.clone())).unwrap();

    assert!(report.is_success());
    assert_eq!(report.written.len(), 2);

    let a = fs::read_to_string(ws.output.join("mod.a/module-info.java")).unwrap();
    assert_eq!(
        a,
        "module mod.a {\n    requires static d;\n    requires mod.b;\n\n    exports com.example.a.api;\n}\n"
    );

    let b = fs::read_to_string(ws.output.join("mod.b/module-info.java")).unwrap();
    assert_eq!(b, "module mod.b {\n    exports com.example.b;\n}\n");
}

#[test]
fn test_override_processes_only_the_given_artifact() {
    let ws = workspace();
    let mut args = args(ws.config.clone());
    args.artifact = Some("com.example:c:1.0".to_string());
    args.module_name = Some("mod.c".to_string());
    args.exports = Some("*".to_string());
    args.additional_dependencies = Some("com.example:b:1.0".to_string());

    let report = generate(args).unwrap();

    assert_eq!(report.written.len(), 1);
    let c = fs::read_to_string(ws.output.join("mod.c/module-info.java")).unwrap();
    // b is still known by its configured name
    assert!(c.contains("requires mod.b;"));
    assert!(!ws.output.join("mod.a").exists());
}

#[test]
fn test_unknown_artifact_fails() {
    let ws = workspace();
    let mut args = args(ws.config.clone());
    args.artifact = Some("com.example:missing:1.0".to_string());
    args.module_name = Some("mod.missing".to_string());

    assert!(generate(args).is_err());
}
