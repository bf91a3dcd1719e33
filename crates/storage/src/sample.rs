use duty_core::TariffRecord;

fn in_section_one(mut record: TariffRecord, chapter: &str) -> TariffRecord {
    record.section = Some("I".to_string());
    record.chapter = Some(chapter.to_string());
    record
}

/// Small development schedule covering ad valorem, free and per-kg lines.
pub fn sample_records() -> Vec<TariffRecord> {
    vec![
        in_section_one(
            TariffRecord::new("0101.30.00.00", "Asses")
                .with_general("6.8%")
                .with_special("Free (A,AU,BH,CA,CL,CO,D,E,IL,JO,KR,MA,MX,OM,P,PA,PE,SG)")
                .with_column2("15%"),
            "01",
        ),
        in_section_one(
            TariffRecord::new("0102.21.00.00", "Pure-bred breeding cattle")
                .with_general("Free")
                .with_special("Free")
                .with_column2("Free"),
            "01",
        ),
        in_section_one(
            TariffRecord::new(
                "0201.10.05.00",
                "Beef, fresh or chilled, carcasses and half-carcasses, high quality",
            )
            .with_general("4.4¢/kg")
            .with_special("2.2¢/kg (AU,CA,MX)")
            .with_column2("30.8¢/kg"),
            "02",
        ),
        in_section_one(
            TariffRecord::new("0301.11.00.00", "Ornamental fish, live")
                .with_general("Free")
                .with_special("Free")
                .with_column2("Free"),
            "03",
        ),
    ]
}
