//! Houses marked for a closer look.
//!
//! `marked.csv` lists zpids (with the day they were marked). Marking a house
//! downloads its pictures and raw detail JSON into `pics/<zpid>/`; the report
//! re-fetches every marked house into `marked_detail_YYMMDD.csv`.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::config::Settings;
use crate::error::{CollectorError, Result};
use crate::helpers::date_stamp;
use crate::records::{latest_event, PropertyRecord};
use crate::report::{Event, Reporter};
use crate::writer::{snapshot_name, write_records, WriteOutcome};
use crate::zillow::{DetailSource, ImageSource};

/// zpids in `marked.csv`, in file order. A missing file means nothing is marked.
pub fn read_marked(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let mut reader = csv::Reader::from_path(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h == "zpid")
        .ok_or_else(|| CollectorError::Configuration(format!("{:?} has no zpid column", path)))?;

    let mut zpids = vec![];
    for row in reader.records() {
        if let Some(zpid) = row?.get(column) {
            zpids.push(zpid.trim().to_string());
        }
    }
    Ok(zpids)
}

/// Adds one zpid, creating the file with its header on first use.
pub fn append_marked(path: &Path, zpid: &str, marked_on: NaiveDate) -> Result<()> {
    let is_new = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    if is_new {
        writer.write_record(["zpid", "markedDate"])?;
    }
    writer.write_record([zpid, date_stamp(marked_on).as_str()])?;
    writer.flush()?;
    Ok(())
}

/// File name a picture URL is saved under
fn picture_name(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Marks each zpid not already in `marked.csv`: pictures and detail JSON land in
/// `pics/<zpid>/`, then the zpid is appended. Returns how many were newly marked.
pub async fn mark_houses<C, R>(
    client: &C,
    settings: &Settings,
    zpids: &[String],
    today: NaiveDate,
    reporter: &R,
) -> Result<usize>
where
    C: DetailSource + ImageSource,
    R: Reporter,
{
    let mut marked = read_marked(&settings.marked_file)?;
    let mut newly_marked = 0;

    for zpid in zpids {
        if marked.contains(zpid) {
            reporter.report(Event::AlreadyMarked { zpid: zpid.clone() });
            continue;
        }

        let dir: PathBuf = settings.pics_dir.join(zpid);
        tokio::fs::create_dir_all(&dir).await?;

        let urls = client.image_urls(zpid).await?;
        let mut pictures = 0;
        for url in &urls {
            let Some(name) = picture_name(url) else { continue };
            client.download(url, &dir.join(name)).await?;
            pictures += 1;
        }

        let detail = client.fetch_detail(zpid).await?;
        tokio::fs::write(dir.join("detail.json"), serde_json::to_string_pretty(&detail)?).await?;

        append_marked(&settings.marked_file, zpid, today)?;
        marked.push(zpid.clone());
        newly_marked += 1;
        reporter.report(Event::Marked {
            zpid: zpid.clone(),
            pictures,
        });
    }

    Ok(newly_marked)
}

/// Fetches every marked house and writes `marked_detail_YYMMDD.csv`.
pub async fn marked_report<C, R>(
    client: &C,
    settings: &Settings,
    today: NaiveDate,
    reporter: &R,
) -> Result<WriteOutcome>
where
    C: DetailSource,
    R: Reporter,
{
    let zpids = crate::merge::unique_zpids(&read_marked(&settings.marked_file)?, reporter);

    let mut records = Vec::with_capacity(zpids.len());
    for zpid in &zpids {
        let detail = client.fetch_detail(zpid).await?;
        let mut record = PropertyRecord::from_detail(zpid, &detail, &settings.site_url)?;
        record.push_field("latest_event", latest_event(&detail));
        records.push(record);
        reporter.report(Event::Fetched { zpid: zpid.clone() });
    }

    let path = settings.output_dir.join(snapshot_name("marked_detail", today));
    let outcome = write_records(&records, &path)?;
    match &outcome {
        WriteOutcome::Written { path, rows } => reporter.report(Event::Written {
            path: path.clone(),
            rows: *rows,
        }),
        WriteOutcome::NoData => reporter.report(Event::NoData { path }),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DETAIL_FIELDS;
    use crate::report::RecordingReporter;
    use crate::testing::FakeZillow;

    fn settings(root: &Path) -> Settings {
        let builder = Settings::defaults()
            .unwrap()
            .set_override("output_dir", root.to_string_lossy().to_string())
            .unwrap()
            .set_override("marked_file", root.join("marked.csv").to_string_lossy().to_string())
            .unwrap()
            .set_override("pics_dir", root.join("pics").to_string_lossy().to_string())
            .unwrap();
        Settings::from_builder(builder).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn marked_file_round_trips_zpids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marked.csv");
        assert!(read_marked(&path).unwrap().is_empty());

        append_marked(&path, "111", today()).unwrap();
        append_marked(&path, "222", today()).unwrap();

        assert_eq!(read_marked(&path).unwrap(), vec!["111", "222"]);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("zpid,markedDate\n111,240115\n"));
    }

    #[test]
    fn picture_names_come_from_url_path() {
        assert_eq!(
            picture_name("https://photos.zillowstatic.com/fp/abc-cc_ft_1536.jpg").as_deref(),
            Some("abc-cc_ft_1536.jpg")
        );
        assert_eq!(picture_name("not a url"), None);
    }

    #[tokio::test]
    async fn marking_downloads_pictures_once_per_house() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let fake = FakeZillow::default().with_images(
            "111",
            &["https://photos.example.com/p/one.jpg", "https://photos.example.com/p/two.jpg"],
        );
        let reporter = RecordingReporter::default();
        let zpids = vec!["111".to_string(), "111".to_string()];

        let count = mark_houses(&fake, &settings, &zpids, today(), &reporter)
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(fake.downloads().len(), 2);
        assert!(dir.path().join("pics/111/one.jpg").exists());
        assert!(dir.path().join("pics/111/detail.json").exists());
        assert_eq!(read_marked(&settings.marked_file).unwrap(), vec!["111"]);
        assert_eq!(
            reporter.events(),
            vec![
                Event::Marked { zpid: "111".into(), pictures: 2 },
                Event::AlreadyMarked { zpid: "111".into() },
            ]
        );
    }

    #[tokio::test]
    async fn report_adds_latest_event_column() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        append_marked(&settings.marked_file, "111", today()).unwrap();
        append_marked(&settings.marked_file, "222", today()).unwrap();
        let fake = FakeZillow::default();

        let outcome = marked_report(&fake, &settings, today(), &RecordingReporter::default())
            .await
            .unwrap();

        let path = dir.path().join("marked_detail_240115.csv");
        assert_eq!(outcome, WriteOutcome::Written { path: path.clone(), rows: 2 });
        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, format!("{},latest_event", DETAIL_FIELDS.join(",")));
        assert!(text.contains("2024-01-20 Price change 300000"));
    }

    #[tokio::test]
    async fn report_with_nothing_marked_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let fake = FakeZillow::default();

        let outcome = marked_report(&fake, &settings, today(), &RecordingReporter::default())
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::NoData);
        assert!(fake.detail_calls().is_empty());
    }
}
