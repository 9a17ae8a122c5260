#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut container = match tiff_structure::Container::open(Cursor::new(data)) {
        Ok(c) => c,
        Err(_) => return,
    };

    let Ok(root) = container.root_ifd_offset() else {
        return;
    };

    for entry in container.ifd_chain(root) {
        let Ok((_, ifd)) = entry else { break };
        for tag in ifd.tags() {
            let _ = container.tag_data(&ifd, tag);
        }
    }
});
