use chrono::{Datelike, NaiveDate};

use rusty_air::data::loader::read_csv;
use rusty_air::stats::{describe, monthly_mean, pairwise_correlation, yearly_mean};
use rusty_air::{AirQualityDataset, FilterCriteria, PipelineError, Severity, filter, index_by_time};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Two years of daily rows on the 1st and 15th of each month, with a few
/// gaps and an impossible date.
fn prsa_dataset() -> AirQualityDataset {
    let mut csv = String::from("No,year,month,day,hour,PM2.5,PM10,SO2,NO2,TEMP,wd\n");
    let mut no = 0;
    for year in 2013..=2014 {
        for month in 1..=12 {
            for day in [1, 15] {
                no += 1;
                let pm25 = if no % 7 == 0 { "NA".to_string() } else { (no * 3).to_string() };
                let pm10 = no * 5 + month;
                let so2 = 100 - no;
                let no2 = (no * no) % 17;
                let temp = month as f64 - 6.5;
                csv.push_str(&format!(
                    "{no},{year},{month},{day},0,{pm25},{pm10},{so2},{no2},{temp},NW\n"
                ));
            }
        }
    }
    csv.push_str("999,2014,2,29,0,1,1,1,1,1,NW\n");
    let table = read_csv(csv.as_bytes()).unwrap();
    index_by_time(table).unwrap().0
}

fn criteria(start: NaiveDate, end: NaiveDate, years: (i32, i32)) -> FilterCriteria {
    FilterCriteria {
        start_date: start,
        end_date: end,
        year_min: years.0,
        year_max: years.1,
        pollutants: vec!["PM2.5".into(), "PM10".into()],
        parameters: vec!["TEMP".into()],
    }
}

#[test]
fn invalid_dates_are_dropped_at_indexing() {
    let ds = prsa_dataset();
    assert_eq!(ds.len(), 48);
    assert_eq!(ds.date_bounds(), Some((date(2013, 1, 1), date(2014, 12, 15))));
}

#[test]
fn filter_output_lies_within_both_windows() {
    let ds = prsa_dataset();
    let c = criteria(date(2013, 6, 10), date(2014, 3, 1), (2014, 2014));
    let out = filter(&ds, &c).unwrap();
    assert!(!out.is_empty());
    for obs in &out.observations {
        assert!(obs.date() >= c.start_date && obs.date() <= c.end_date);
        assert_eq!(obs.date().year(), 2014);
    }
    assert_eq!(out.len(), 5);
}

#[test]
fn filter_is_idempotent() {
    let ds = prsa_dataset();
    let c = criteria(date(2013, 2, 1), date(2014, 8, 31), (2013, 2014));
    let once = filter(&ds, &c).unwrap();
    let twice = filter(&once, &c).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn describe_counts_non_missing_values() {
    let ds = prsa_dataset();
    let c = criteria(date(2013, 1, 1), date(2014, 12, 31), (2013, 2014));
    let out = filter(&ds, &c).unwrap();
    let stats = describe(&out, &["PM2.5", "PM10"]).unwrap();
    let missing = (1..=48).filter(|n| n % 7 == 0).count();
    assert_eq!(stats.get("PM2.5").unwrap().count, 48 - missing);
    assert_eq!(stats.get("PM10").unwrap().count, 48);
}

#[test]
fn correlation_is_symmetric() {
    let ds = prsa_dataset();
    let cols = ["PM2.5", "PM10", "SO2", "NO2", "TEMP"];
    let corr = pairwise_correlation(&ds, &cols).unwrap();
    let m = corr.as_matrix().unwrap();
    for a in cols {
        assert_eq!(m.get(a, a), Some(1.0));
        for b in cols {
            assert_eq!(m.get(a, b), m.get(b, a));
        }
    }

    let ab = pairwise_correlation(&ds, &["PM2.5", "SO2"]).unwrap();
    let ba = pairwise_correlation(&ds, &["SO2", "PM2.5"]).unwrap();
    assert_eq!(ab.as_coefficient(), ba.as_coefficient());
    assert!((ab.as_coefficient().unwrap() + 1.0).abs() < 1e-9);
}

#[test]
fn monthly_and_yearly_means_are_chronological() {
    let ds = prsa_dataset();
    let monthly = monthly_mean(&ds, &["PM10"]).unwrap();
    let periods: Vec<NaiveDate> = monthly.iter().map(|p| p.period).collect();
    assert_eq!(periods.len(), 24);
    assert!(periods.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(periods[1], date(2013, 2, 28));

    let yearly = yearly_mean(&ds, &["PM2.5", "PM10"]).unwrap();
    let points: Vec<_> = yearly.iter().collect();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].period, date(2013, 12, 31));
    assert!(points[0].means[1] < points[1].means[1]);
}

#[test]
fn reversed_range_is_rejected_before_aggregation() {
    let ds = prsa_dataset();
    let c = criteria(date(2014, 1, 1), date(2013, 1, 1), (2013, 2014));
    let err = filter(&ds, &c).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidRange { .. }));
    assert_eq!(err.severity(), Severity::View);
}

#[test]
fn unknown_pollutant_fails_only_the_aggregate() {
    let ds = prsa_dataset();
    let mut c = criteria(date(2013, 1, 1), date(2013, 12, 31), (2013, 2013));
    c.pollutants = vec!["XYZ".into()];
    let out = filter(&ds, &c).unwrap();
    assert_eq!(
        describe(&out, &c.pollutants).unwrap_err(),
        PipelineError::ColumnUnavailable {
            column: "XYZ".into()
        }
    );
}

#[test]
fn two_row_example() {
    let table = read_csv("year,month,day,PM2.5\n2013,3,1,10\n2013,3,2,20\n".as_bytes()).unwrap();
    let (ds, _) = index_by_time(table).unwrap();
    assert_eq!(ds.observations[0].date(), date(2013, 3, 1));
    assert_eq!(ds.observations[1].date(), date(2013, 3, 2));
    let stats = describe(&ds, &["PM2.5"]).unwrap();
    assert_eq!(stats.columns[0].count, 2);
    assert_eq!(stats.columns[0].mean, 15.0);
}
