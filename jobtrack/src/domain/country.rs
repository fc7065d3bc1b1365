named_enum!(
    /// Country of a job, stored by variant name (`UnitedStates`).
    Country, "country" {
        Argentina,
        Australia,
        Austria,
        Belgium,
        Brazil,
        Canada,
        Chile,
        China,
        Colombia,
        CzechRepublic,
        Denmark,
        Egypt,
        Estonia,
        Finland,
        France,
        Germany,
        Greece,
        HongKong,
        Hungary,
        India,
        Indonesia,
        Ireland,
        Israel,
        Italy,
        Japan,
        Jordan,
        Kuwait,
        Lebanon,
        Luxembourg,
        Malaysia,
        Mexico,
        Morocco,
        Netherlands,
        NewZealand,
        Nigeria,
        Norway,
        Oman,
        Pakistan,
        Philippines,
        Poland,
        Portugal,
        Qatar,
        Romania,
        SaudiArabia,
        Singapore,
        SouthAfrica,
        SouthKorea,
        Spain,
        Sweden,
        Switzerland,
        Taiwan,
        Thailand,
        Turkey,
        Ukraine,
        UnitedArabEmirates,
        UnitedKingdom,
        UnitedStates,
        Vietnam,
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variant_names() {
        assert_eq!("UnitedStates".parse::<Country>().unwrap(), Country::UnitedStates);
        assert_eq!("unitedkingdom".parse::<Country>().unwrap(), Country::UnitedKingdom);
        let err = "Atlantis".parse::<Country>().unwrap_err();
        assert_eq!(err.kind, "country");
    }
}
