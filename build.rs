// 构建脚本: 链接 ez-ffmpeg 静态库所需的系统库
fn main() {
    // 仅在Windows MSVC环境下需要 (vcpkg 静态 FFmpeg)
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // x264 编码器 (标注视频输出)
        println!("cargo:rustc-link-lib=dylib=libx264");

        // OLE 自动化和VFW
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Secure Channel (TLS/SSL)
        println!("cargo:rustc-link-lib=dylib=secur32");
    }
}
