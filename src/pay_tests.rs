// src/pay_tests.rs

#[cfg(test)]
mod tests {
    use crate::error::PayrollError;
    use crate::models::*;
    use crate::pay::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn hours(regular: Decimal, overtime: Decimal) -> HoursWorked {
        HoursWorked {
            regular,
            overtime,
            ..Default::default()
        }
    }

    fn attendance(employee: &str, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            employee: Ref::Id(employee.to_string()),
            date: d(date),
            day: false,
            night: false,
            ot_day: false,
            ot_night: false,
            np: false,
            status: EmployeeStatus::Active,
        }
    }

    fn record(employee: &str, vessel: &str, rate: Decimal, regular: Decimal) -> PayrollRecord {
        PayrollRecord {
            id: Some(format!("{}-{}", employee, vessel)),
            employee: Some(Ref::Id(employee.to_string())),
            vessel: Some(Ref::Id(vessel.to_string())),
            rate,
            regular_hours: regular,
            ..Default::default()
        }
    }

    #[test]
    fn test_regular_hours_only() {
        let pay = compute_pay(dec!(100), &hours(dec!(8), Decimal::ZERO)).unwrap();
        assert_eq!(pay.regular, dec!(800.00));
        assert_eq!(pay.gross, dec!(800.00));
        assert_eq!(pay.net, pay.gross);
    }

    #[test]
    fn test_overtime_uses_one_point_two_five() {
        let pay = compute_pay(dec!(100), &hours(Decimal::ZERO, dec!(4))).unwrap();
        assert_eq!(OVERTIME_MULTIPLIER, dec!(1.25));
        assert_eq!(pay.overtime, dec!(500.00));
        assert_eq!(pay.gross, dec!(500.00));
    }

    #[test]
    fn test_night_differential_is_additive_premium() {
        let worked = HoursWorked {
            regular: dec!(8),
            night_differential: dec!(8),
            ..Default::default()
        };
        let pay = compute_pay(dec!(100), &worked).unwrap();
        assert_eq!(pay.regular, dec!(800));
        assert_eq!(pay.night_differential, dec!(80));
        assert_eq!(pay.gross, dec!(880));
    }

    #[test]
    fn test_sunday_categories_share_multiplier() {
        let worked = HoursWorked {
            sunday: dec!(8),
            sunday_overtime: dec!(2),
            ..Default::default()
        };
        let pay = compute_pay(dec!(100), &worked).unwrap();
        assert_eq!(pay.sunday, dec!(1040));
        assert_eq!(pay.sunday_overtime, dec!(260));
        assert_eq!(pay.gross, dec!(1300));
    }

    #[test]
    fn test_components_round_to_centavos() {
        // 33.333 * 1.25 * 1 = 41.66625
        let pay = compute_pay(dec!(33.333), &hours(Decimal::ZERO, dec!(1))).unwrap();
        assert_eq!(pay.overtime, dec!(41.67));
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        for rate in [Decimal::ZERO, dec!(-5)] {
            match compute_pay(rate, &hours(dec!(8), Decimal::ZERO)) {
                Err(PayrollError::Validation(msg)) => assert!(msg.contains("rate")),
                other => panic!("Expected Validation error but got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_negative_hours() {
        let worked = HoursWorked {
            sunday_overtime: dec!(-1),
            ..Default::default()
        };
        match compute_pay(dec!(100), &worked) {
            Err(PayrollError::Validation(msg)) => assert!(msg.contains("sunday overtime")),
            other => panic!("Expected Validation error but got: {:?}", other),
        }
    }

    #[test]
    fn test_deductions_reduce_net_only() {
        let pay = compute_pay(dec!(100), &hours(dec!(8), Decimal::ZERO))
            .unwrap()
            .with_deductions(dec!(150.5))
            .unwrap();
        assert_eq!(pay.gross, dec!(800));
        assert_eq!(pay.net, dec!(649.50));

        let negative = compute_pay(dec!(100), &hours(dec!(8), Decimal::ZERO))
            .unwrap()
            .with_deductions(dec!(-1));
        assert!(matches!(negative, Err(PayrollError::Validation(_))));
    }

    #[test]
    fn test_record_pay_prefers_backend_figures() {
        let mut stored = record("E1", "V1", dec!(100), dec!(8));
        stored.gross_pay = Some(dec!(900));
        stored.net_pay = Some(dec!(850));
        assert_eq!(record_pay(&stored).unwrap(), (dec!(900), dec!(850)));

        let computed = record("E1", "V1", dec!(100), dec!(8));
        assert_eq!(record_pay(&computed).unwrap(), (dec!(800), dec!(800)));
    }

    proptest! {
        #[test]
        fn prop_gross_is_non_negative_and_monotonic(
            rate_cents in 1u32..1_000_000,
            base in proptest::array::uniform5(0u32..10_000),
            category in 0usize..5,
            extra in 0u32..10_000,
        ) {
            let rate = Decimal::new(rate_cents as i64, 2);
            let tenths = |v: u32| Decimal::new(v as i64, 1);
            let worked = HoursWorked {
                regular: tenths(base[0]),
                overtime: tenths(base[1]),
                night_differential: tenths(base[2]),
                sunday: tenths(base[3]),
                sunday_overtime: tenths(base[4]),
            };
            let mut more = worked;
            match category {
                0 => more.regular += tenths(extra),
                1 => more.overtime += tenths(extra),
                2 => more.night_differential += tenths(extra),
                3 => more.sunday += tenths(extra),
                _ => more.sunday_overtime += tenths(extra),
            }

            let before = compute_pay(rate, &worked).unwrap();
            let after = compute_pay(rate, &more).unwrap();
            prop_assert!(before.gross >= Decimal::ZERO);
            prop_assert!(after.gross >= before.gross);
        }
    }

    #[test]
    fn test_aggregate_attendance_weekday_and_sunday() {
        // 2024-01-07 is a Sunday
        let mut monday = attendance("E1", "2024-01-08");
        monday.day = true;
        monday.ot_day = true;
        let mut sunday = attendance("E1", "2024-01-07");
        sunday.day = true;
        sunday.ot_night = true;
        let mut night = attendance("E2", "2024-01-09");
        night.night = true;
        night.np = true;
        let mut premium_only = attendance("E3", "2024-01-10");
        premium_only.np = true;
        let mut overtime_night = attendance("E4", "2024-01-11");
        overtime_night.ot_night = true;
        overtime_night.np = true;

        let period = PayPeriod::new(d("2024-01-01"), d("2024-01-15"));
        let totals = aggregate_attendance(
            &[monday, sunday, night, premium_only, overtime_night],
            &period,
            &ShiftHours::default(),
        )
        .unwrap();

        let e1 = totals.get("E1").unwrap();
        assert_eq!(e1.regular, dec!(8));
        assert_eq!(e1.overtime, dec!(4));
        assert_eq!(e1.sunday, dec!(8));
        assert_eq!(e1.sunday_overtime, dec!(4));
        assert_eq!(e1.night_differential, dec!(4));

        // np with a night shift does not double count
        let e2 = totals.get("E2").unwrap();
        assert_eq!(e2.regular, dec!(8));
        assert_eq!(e2.night_differential, dec!(8));

        let e3 = totals.get("E3").unwrap();
        assert_eq!(e3.regular, Decimal::ZERO);
        assert_eq!(e3.overtime, Decimal::ZERO);
        assert_eq!(e3.night_differential, dec!(8));

        // OT night hours are covered by the np premium, not added to it
        let e4 = totals.get("E4").unwrap();
        assert_eq!(e4.overtime, dec!(4));
        assert_eq!(e4.night_differential, dec!(8));
    }

    #[test]
    fn test_aggregate_attendance_skips_inactive_and_out_of_period() {
        let mut on_leave = attendance("E1", "2024-01-08");
        on_leave.day = true;
        on_leave.status = EmployeeStatus::OnLeave;
        let mut outside = attendance("E1", "2024-02-01");
        outside.day = true;
        let mut counted = attendance("E1", "2024-01-09");
        counted.day = true;

        let period = PayPeriod::new(d("2024-01-01"), d("2024-01-15"));
        let totals =
            aggregate_attendance(&[on_leave, outside, counted], &period, &ShiftHours::default())
                .unwrap();
        assert_eq!(totals.get("E1").unwrap().regular, dec!(8));
    }

    #[test]
    fn test_aggregate_attendance_rejects_duplicate_day() {
        let first = attendance("E1", "2024-01-08");
        let second = attendance("E1", "2024-01-08");
        let result = aggregate_attendance(&[first, second], &PayPeriod::default(), &ShiftHours::default());
        match result {
            Err(PayrollError::Validation(msg)) => assert!(msg.contains("duplicate")),
            other => panic!("Expected Validation error but got: {:?}", other),
        }
    }

    #[test]
    fn test_summary_groups_by_employee_and_vessel() {
        let mut first = record("E1", "V1", dec!(100), dec!(8));
        first.pay_period = Some(PayPeriod::new(d("2024-01-01"), d("2024-01-15")));
        let mut second = record("E1", "V2", dec!(100), dec!(4));
        second.pay_period = Some(PayPeriod::new(d("2024-01-16"), d("2024-01-31")));
        let third = record("E2", "V1", dec!(50), dec!(10));

        let summary = PayrollSummary::from_records(&[first, second, third]);

        let e1 = summary.per_employee.get("E1").unwrap();
        assert_eq!(e1.records, 2);
        assert_eq!(e1.hours.regular, dec!(12));
        assert_eq!(e1.gross, dec!(1200));

        let v1 = summary.per_vessel.get("V1").unwrap();
        assert_eq!(v1.records, 2);
        assert_eq!(v1.gross, dec!(1300));

        assert_eq!(summary.overall.records, 3);
        assert_eq!(summary.overall.gross, dec!(1700));
        assert_eq!(summary.earliest_start, Some(d("2024-01-01")));
        assert_eq!(summary.latest_end, Some(d("2024-01-31")));
    }

    #[test]
    fn test_summary_skips_unpriceable_record() {
        let broken = record("E1", "V1", Decimal::ZERO, dec!(8));
        let priced = record("E2", "V1", dec!(100), dec!(8));
        let mut reported = record("E3", "V1", Decimal::ZERO, dec!(8));
        reported.gross_pay = Some(dec!(640));

        let summary = PayrollSummary::from_records(&[broken, priced, reported]);

        assert_eq!(summary.unpriced, vec!["E1-V1".to_string()]);
        assert!(summary.per_employee.get("E1").is_none());
        assert_eq!(summary.overall.records, 2);
        assert_eq!(summary.overall.gross, dec!(1440));
        assert_eq!(summary.per_vessel.get("V1").unwrap().records, 2);
    }
}
