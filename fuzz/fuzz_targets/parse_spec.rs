#![no_main]

use libfuzzer_sys::fuzz_target;
use depwatch_lookup::PackageQuery;

fuzz_target!(|data: &[u8]| {
    if let Ok(spec) = std::str::from_utf8(data) {
        if let Ok(query) = PackageQuery::parse_spec(spec) {
            // 파싱에 성공한 질의의 이름은 비어 있을 수 없습니다.
            assert!(!query.name.is_empty());
        }
    }
});
