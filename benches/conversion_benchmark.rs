use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use sheetzip::types::{CellValue, Sheet, Workbook};
use sheetzip::{ConvertOptions, WorkbookConverter};

fn xlsx_fixture(sheets: usize, rows: u32) -> Vec<u8> {
    let mut workbook = XlsxWorkbook::new();
    for s in 0..sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(format!("Sheet_{}", s)).unwrap();
        worksheet.write_string(0, 0, "ID").unwrap();
        worksheet.write_string(0, 1, "Name").unwrap();
        worksheet.write_string(0, 2, "Value").unwrap();
        for i in 1..=rows {
            worksheet.write_number(i, 0, i).unwrap();
            worksheet
                .write_string(i, 1, format!("Name, \"{}\"", i))
                .unwrap();
            worksheet.write_number(i, 2, i as f64 * 1.5).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn in_memory_fixture(rows: usize) -> Workbook {
    let mut sheet = Sheet::new("Data");
    for i in 0..rows {
        sheet.push_row(vec![
            CellValue::from(i as i64),
            CellValue::from(format!("Name_{}", i)),
            CellValue::from(i as f64 * 1.5),
        ]);
    }
    vec![sheet].into_iter().collect()
}

fn benchmark_convert_xlsx(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_xlsx");
    group.sample_size(10);

    for size in [1000, 5000, 10000].iter() {
        let data = xlsx_fixture(3, *size);
        let converter = WorkbookConverter::new();

        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| converter.convert(black_box(data)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_compression_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_level");
    group.sample_size(10);

    let workbook = in_memory_fixture(10000);
    for level in [0u32, 1, 6, 9].iter() {
        let converter =
            WorkbookConverter::with_options(ConvertOptions::new().compression_level(*level));

        group.bench_with_input(BenchmarkId::from_parameter(level), level, |b, _| {
            b.iter(|| converter.convert_workbook(black_box(&workbook)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_convert_xlsx,
    benchmark_compression_levels
);
criterion_main!(benches);
