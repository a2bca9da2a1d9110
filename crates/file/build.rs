use cfg_if::cfg_if;

fn main() {
    #[cfg(feature = "auto")]
    select_backing_feature();
}

#[allow(unused)]
fn select_backing_feature() {
    let backing_feature = {
        cfg_if! {
            if #[cfg(target_family = "unix")] {
                "mmap"
            } else {
                "fs"
            }
        }
    };

    println!(r#"cargo:rustc-cfg=feature="{backing_feature}""#);
}
