use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use asozd_parser::pipeline::{process_file, run_batch, BatchOptions, ParserConfig};
use asozd_parser::textutil::LINE_SEPARATOR;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId6" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image2.jpg"/><Relationship Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="http://www.duma.gov.ru/structure/factions/er/" TargetMode="External"/></Relationships>"#;

const IMAGE: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";

fn text_para(id: &str, text: &str) -> String {
    format!(
        r#"<w:p w14:paraId="{id}"><w:pPr><w:jc w:val="both"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
    )
}

fn profile_document() -> String {
    let name = r#"<w:p w14:paraId="01"><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rId6"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r><w:proofErr w:type="spellStart"/><w:r><w:t>Бессарабов Даниил Владимирович</w:t></w:r></w:p>"#;
    let fraction = r#"<w:p w14:paraId="04"><w:r><w:t>Ф</w:t></w:r><w:hyperlink r:id="rId8"><w:r><w:t>ракци</w:t></w:r></w:hyperlink><w:hyperlink r:id="rId8"><w:r><w:t>я</w:t></w:r></w:hyperlink><w:r><w:t xml:space="preserve"> “Единая Россия”</w:t></w:r></w:p>"#;
    let bio = r#"<w:p w14:paraId="05"><w:r><w:t xml:space="preserve">Биография: </w:t></w:r><w:r><w:t xml:space="preserve">Родился 9 июля 1976 г. </w:t><w:br/><w:t>С 2016 года - депутат.</w:t></w:r></w:p>"#;
    let paragraphs = [
        text_para("00", "Анкета"),
        name.to_string(),
        text_para("02", "Депутат Государственной Думы VII созыва,"),
        text_para("03", "избран от избирательного округа 0039"),
        fraction.to_string(),
        text_para("06", ""),
        bio.to_string(),
        text_para("07", "Аффиляция, связи: Близок к губернатору. Женат, имеет двух сыновей."),
        text_para("08", "Внесенные законопроекты: об уточнении полномочий"),
        text_para("09", "Выводы: региональное лобби"),
        text_para("10", "Группа лоббистов:"),
        text_para("11", "региональное лобби/Алтайский край"),
        text_para("12", "  "),
    ];
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        paragraphs.concat()
    )
}

fn write_docx(path: &Path, document_xml: &str, with_image: bool) {
    let f = std::fs::File::create(path).expect("create docx");
    let mut z = ZipWriter::new(f);
    let mut parts: Vec<(&str, &[u8])> = vec![
        ("word/document.xml", document_xml.as_bytes()),
        ("word/_rels/document.xml.rels", RELS.as_bytes()),
        (
            "docProps/app.xml",
            b"<Properties><AppVersion>16.0000</AppVersion></Properties>",
        ),
    ];
    if with_image {
        parts.push(("word/media/image2.jpg", IMAGE));
    }
    for (name, data) in parts {
        z.start_file(name, SimpleFileOptions::default()).expect("start file");
        z.write_all(data).expect("write part");
    }
    z.finish().expect("finish zip");
}

fn read_json(path: &Path) -> serde_json::Value {
    let bytes = std::fs::read(path).expect("read json");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[test]
fn parses_profile_into_json_and_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("Бессарабов.docx");
    write_docx(&input, &profile_document(), true);
    let out = dir.path().join("out");
    let cfg = ParserConfig::builtin().expect("config");

    let saved = process_file(&input, &cfg, &out, None).expect("process");
    assert_eq!(saved.json_path, out.join("Бессарабов Даниил Владимирович.json"));
    assert_eq!(
        saved.image_paths,
        vec![out.join("images").join("Бессарабов Даниил Владимирович.jpg")]
    );
    assert_eq!(std::fs::read(&saved.image_paths[0]).expect("image"), IMAGE);

    let json = read_json(&saved.json_path);
    let keys: Vec<_> = json
        .as_object()
        .expect("object")
        .keys()
        .cloned()
        .collect::<Vec<String>>();
    assert_eq!(keys.len(), 10);

    assert_eq!(json["fio"], "Бессарабов Даниил Владимирович");
    assert_eq!(
        json["photo"],
        serde_json::json!(["images/Бессарабов Даниил Владимирович.jpg"])
    );
    assert_eq!(
        json["position"],
        format!(
            "Депутат Государственной Думы VII созыва,{LINE_SEPARATOR}избран от избирательного округа 0039"
        )
    );
    assert_eq!(
        json["fraction"],
        r#"Ф<a href="http://www.duma.gov.ru/structure/factions/er/">ракци</a><a href="http://www.duma.gov.ru/structure/factions/er/">я</a> “Единая Россия”"#
    );
    assert_eq!(
        json["bio"],
        format!("Родился 9 июля 1976 г. {LINE_SEPARATOR}С 2016 года - депутат.")
    );
    assert_eq!(
        json["relations"],
        "Близок к губернатору. Женат, имеет двух сыновей."
    );
    assert_eq!(json["family"], "Женат, имеет двух сыновей.");
    assert_eq!(json["submitted"], "об уточнении полномочий");
    assert_eq!(json["conclusion"], "региональное лобби");
    assert_eq!(
        json["lobby"],
        serde_json::json!(["региональное лобби/Алтайский край"])
    );
}

#[test]
fn explicit_json_name_is_used_for_single_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("profile.docx");
    write_docx(&input, &profile_document(), true);
    let out = dir.path().join("out");
    let cfg = ParserConfig::builtin().expect("config");

    let opts = BatchOptions {
        out_dir: out.clone(),
        json_name: Some("test_source_n1.json".to_string()),
        jobs: Some(1),
    };
    let summary = run_batch(&[input], &cfg, &opts).expect("batch");
    assert_eq!(summary.succeeded, 1);
    assert!(out.join("test_source_n1.json").is_file());
}

#[test]
fn missing_image_part_fails_only_that_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.docx");
    let bad = dir.path().join("bad.docx");
    write_docx(&good, &profile_document(), true);
    write_docx(&bad, &profile_document().replace("Бессарабов", "Иванов"), false);
    let out = dir.path().join("out");
    let cfg = ParserConfig::builtin().expect("config");

    let inputs: Vec<PathBuf> = vec![bad, good];
    let opts = BatchOptions {
        out_dir: out.clone(),
        json_name: None,
        jobs: Some(2),
    };
    let summary = run_batch(&inputs, &cfg, &opts).expect("batch");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(out.join("Бессарабов Даниил Владимирович.json").is_file());
    assert!(!out.join("Иванов Даниил Владимирович.json").exists());
    assert!(!out
        .join("images")
        .join("Иванов Даниил Владимирович.jpg")
        .exists());
}

#[test]
fn document_without_identity_and_images_needs_explicit_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("anon.docx");
    let xml = format!(
        "<w:document><w:body>{}</w:body></w:document>",
        text_para("01", "Биография: без имени")
    );
    write_docx(&input, &xml, false);
    let out = dir.path().join("out");
    let cfg = ParserConfig::builtin().expect("config");

    assert!(process_file(&input, &cfg, &out, None).is_err());
    let saved = process_file(&input, &cfg, &out, Some("anon")).expect("named");
    let json = read_json(&saved.json_path);
    assert_eq!(json["bio"], "без имени");
    assert_eq!(json["fio"], serde_json::Value::Null);
    assert_eq!(json["photo"], serde_json::Value::Null);
}

#[test]
fn later_document_wins_shared_output_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("a.docx");
    let second = dir.path().join("b.docx");
    write_docx(&first, &profile_document(), true);
    write_docx(
        &second,
        &profile_document().replace("Родился 9 июля 1976 г. ", "Родился 1 мая 1980 г. "),
        true,
    );
    let out = dir.path().join("out");
    let cfg = ParserConfig::builtin().expect("config");

    let opts = BatchOptions {
        out_dir: out.clone(),
        json_name: None,
        jobs: Some(2),
    };
    let summary = run_batch(&[first, second], &cfg, &opts).expect("batch");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.superseded, 1);
    assert_eq!(summary.failed, 0);

    let json = read_json(&out.join("Бессарабов Даниил Владимирович.json"));
    assert_eq!(
        json["bio"],
        format!("Родился 1 мая 1980 г. {LINE_SEPARATOR}С 2016 года - депутат.")
    );
}
