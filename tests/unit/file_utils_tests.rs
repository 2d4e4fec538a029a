/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;
use tmflow::file_utils::FileManager;
use crate::common;

/// Test that document discovery only picks up XLIFF files
#[test]
fn test_findDocuments_withMixedFiles_shouldReturnOnlyXliff() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();

    common::create_test_file(root, "b.xlf", "<xliff/>")?;
    common::create_test_file(root, "a.XLIFF", "<xliff/>")?;
    common::create_test_file(root, "notes.txt", "ignore me")?;
    common::create_test_file(root, "nested/deeper/c.xlf", "<xliff/>")?;

    let documents = FileManager::find_documents(root)?;
    let names: Vec<String> = documents
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();

    assert_eq!(names, vec!["a.XLIFF", "b.xlf", "nested/deeper/c.xlf"]);
    Ok(())
}

/// Test that a single file path is returned as is
#[test]
fn test_findDocuments_withSingleFile_shouldReturnThatFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = common::create_test_file(temp_dir.path(), "Strings.resx.de-DE.xlf", "<xliff/>")?;

    let documents = FileManager::find_documents(&file)?;
    assert_eq!(documents, vec![file]);
    Ok(())
}

/// Test output path computation with and without an output directory
#[test]
fn test_outputPath_withOutputDir_shouldMirrorLayout() {
    let root = Path::new("/work/locales");
    let input = Path::new("/work/locales/app/Strings.xlf");

    assert_eq!(FileManager::output_path(input, root, None), input);
    assert_eq!(
        FileManager::output_path(input, root, Some(Path::new("/out"))),
        Path::new("/out/app/Strings.xlf")
    );
}

/// Test that writing creates missing parent directories
#[test]
fn test_writeToFile_withMissingParents_shouldCreateThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("a/b/c/out.xlf");

    FileManager::write_to_file(&target, "content")?;

    assert!(FileManager::file_exists(&target));
    assert!(FileManager::dir_exists(temp_dir.path().join("a/b")));
    assert_eq!(FileManager::read_to_string(&target)?, "content");
    Ok(())
}

/// Test that reading a missing file reports the path
#[test]
fn test_readToString_withMissingFile_shouldFail() {
    let result = FileManager::read_to_string("/definitely/not/here.xlf");
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("here.xlf"));
}
